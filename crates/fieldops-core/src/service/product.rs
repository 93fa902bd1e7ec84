//! Product catalogue management.

use tracing::info;
use uuid::Uuid;

use crate::error::{FieldOpsError, FieldOpsResult};
use crate::models::claims::Claims;
use crate::models::product::{
    CreateProduct, DuplicateField, PRODUCT_TYPES, Product, UpdateProduct,
};
use crate::repository::{PaginatedResult, ProductQuery, ProductRepository};
use crate::scope::{self, Capability, Predicate, ResourceKind};
use crate::validate;

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    /// Honoured only for the super admin.
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub product_type: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub min_price: f64,
}

fn product_type(value: Option<&str>) -> FieldOpsResult<String> {
    let value = value.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("other");
    if PRODUCT_TYPES.iter().any(|(key, _)| *key == value) {
        Ok(value.to_string())
    } else {
        Err(FieldOpsError::validation(format!(
            "unknown product type: {value}"
        )))
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn conflict(field: DuplicateField) -> FieldOpsError {
    let entity = match field {
        DuplicateField::Name => "product name",
        DuplicateField::SerialNumber => "product serial number",
    };
    FieldOpsError::AlreadyExists {
        entity: entity.into(),
    }
}

pub struct ProductService<P: ProductRepository> {
    products: P,
}

impl<P: ProductRepository> ProductService<P> {
    pub fn new(products: P) -> Self {
        Self { products }
    }

    fn scoped(&self, claims: &Claims) -> FieldOpsResult<Predicate> {
        let pred = scope::scope_for(claims, ResourceKind::Product);
        pred.ensure_allowed(ResourceKind::Product)?;
        Ok(pred)
    }

    pub async fn create(&self, claims: &Claims, input: NewProduct) -> FieldOpsResult<Product> {
        scope::require(claims, Capability::ManageProducts)?;
        let tenant_id = scope::owning_tenant(claims, input.tenant_id)?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(FieldOpsError::validation("Product name is required"));
        }
        if input.quantity < 0 {
            return Err(FieldOpsError::validation("quantity must not be negative"));
        }
        let serial_number = optional_text(input.serial_number);

        if let Some(field) = self
            .products
            .find_duplicate(tenant_id, &name, serial_number.as_deref(), None)
            .await?
        {
            return Err(conflict(field));
        }

        let product = self
            .products
            .create(CreateProduct {
                tenant_id,
                name,
                product_type: product_type(input.product_type.as_deref())?,
                model: optional_text(input.model),
                serial_number,
                quantity: input.quantity,
                price: validate::non_negative("price", input.price)?,
                min_price: validate::non_negative("minPrice", input.min_price)?,
            })
            .await?;

        info!(product_id = %product.id, tenant_id = %tenant_id, "product created");
        Ok(product)
    }

    pub async fn get(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<Product> {
        let pred = self.scoped(claims)?;
        self.products.get_by_id(&pred, id).await
    }

    pub async fn list(
        &self,
        claims: &Claims,
        query: ProductQuery,
    ) -> FieldOpsResult<PaginatedResult<Product>> {
        let pred = self.scoped(claims)?;
        self.products.list(&pred, query).await
    }

    pub async fn update(
        &self,
        claims: &Claims,
        id: Uuid,
        mut input: UpdateProduct,
    ) -> FieldOpsResult<Product> {
        scope::require(claims, Capability::ManageProducts)?;
        let pred = self.scoped(claims)?;
        let current = self.products.get_by_id(&pred, id).await?;

        if let Some(name) = &input.name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(FieldOpsError::validation("Product name is required"));
            }
            input.name = Some(trimmed.to_string());
        }
        if matches!(input.quantity, Some(q) if q < 0) {
            return Err(FieldOpsError::validation("quantity must not be negative"));
        }
        if let Some(price) = input.price {
            validate::non_negative("price", price)?;
        }
        if let Some(min_price) = input.min_price {
            validate::non_negative("minPrice", min_price)?;
        }
        if let Some(kind) = &input.product_type {
            input.product_type = Some(product_type(Some(kind))?);
        }
        // A blank serial clears it like an explicit null.
        input.serial_number = input.serial_number.map(optional_text);

        let name = input.name.as_deref().unwrap_or(&current.name);
        let serial = match &input.serial_number {
            Some(next) => next.as_deref(),
            None => current.serial_number.as_deref(),
        };
        if let Some(field) = self
            .products
            .find_duplicate(current.tenant_id, name, serial, Some(id))
            .await?
        {
            return Err(conflict(field));
        }

        self.products.update(&pred, id, input).await
    }

    pub async fn delete(&self, claims: &Claims, id: Uuid) -> FieldOpsResult<()> {
        scope::require(claims, Capability::ManageProducts)?;
        let pred = self.scoped(claims)?;
        self.products.delete(&pred, id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Report which unique key a prospective product would collide on.
    pub async fn check_duplicate(
        &self,
        claims: &Claims,
        tenant_id: Option<Uuid>,
        name: &str,
        serial_number: Option<&str>,
        exclude: Option<Uuid>,
    ) -> FieldOpsResult<Option<DuplicateField>> {
        scope::require(claims, Capability::ManageProducts)?;
        let tenant_id = scope::owning_tenant(claims, tenant_id)?;
        let serial = serial_number.map(str::trim).filter(|s| !s.is_empty());
        self.products
            .find_duplicate(tenant_id, name.trim(), serial, exclude)
            .await
    }
}
