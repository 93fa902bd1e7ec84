//! SurrealDB implementation of [`ProductRepository`].
//!
//! Name uniqueness is enforced by a unique index over the lowercased
//! name; serial numbers are checked in [`find_duplicate`] because many
//! products carry none.
//!
//! [`find_duplicate`]: ProductRepository::find_duplicate

use chrono::{DateTime, Utc};
use fieldops_core::error::{FieldOpsResult, StockError};
use fieldops_core::models::product::{CreateProduct, DuplicateField, Product, UpdateProduct};
use fieldops_core::repository::{PaginatedResult, ProductQuery, ProductRepository};
use fieldops_core::scope::{Predicate, ResourceKind};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_uuid, scope_filter, search_needle};
use crate::error::DbError;

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * \
     FROM type::record('product', $id)";

#[derive(Debug, SurrealValue)]
struct ProductRow {
    record_id: String,
    tenant_id: String,
    name: String,
    product_type: String,
    model: Option<String>,
    serial_number: Option<String>,
    quantity: i64,
    price: f64,
    min_price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn try_into_product(self) -> Result<Product, DbError> {
        Ok(Product {
            id: parse_uuid("product", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            product_type: self.product_type,
            model: self.model,
            serial_number: self.serial_number,
            quantity: self.quantity,
            price: self.price,
            min_price: self.min_price,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct StockRow {
    #[allow(dead_code)]
    quantity: i64,
}

#[derive(Debug, SurrealValue)]
struct ClashRow {
    name_clash: bool,
}

fn single(rows: Vec<ProductRow>, id: impl ToString) -> Result<Product, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id.to_string(),
        })?
        .try_into_product()
}

/// SurrealDB implementation of the Product repository.
#[derive(Clone)]
pub struct SurrealProductRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> Result<Product, DbError> {
        let mut result = self.db.query(SELECT_ONE).bind(("id", id.to_string())).await?;
        let rows: Vec<ProductRow> = result.take(0)?;
        single(rows, id)
    }
}

impl<C: Connection> ProductRepository for SurrealProductRepository<C> {
    async fn create(&self, input: CreateProduct) -> FieldOpsResult<Product> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('product', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 product_type = $product_type, model = $model, \
                 serial_number = $serial_number, quantity = $quantity, \
                 price = $price, min_price = $min_price; \
                 {SELECT_ONE};"
            ))
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("product_type", input.product_type))
            .bind(("model", input.model))
            .bind(("serial_number", input.serial_number))
            .bind(("quantity", input.quantity))
            .bind(("price", input.price))
            .bind(("min_price", input.min_price))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("product name", e))?;
        let rows: Vec<ProductRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_id(&self, scope: &Predicate, id: Uuid) -> FieldOpsResult<Product> {
        scope.ensure_allowed(ResourceKind::Product)?;
        let product = self.fetch(id).await?;
        scope.check_visible(ResourceKind::Product, id, product.tenant_id, None)?;
        Ok(product)
    }

    async fn update(
        &self,
        scope: &Predicate,
        id: Uuid,
        input: UpdateProduct,
    ) -> FieldOpsResult<Product> {
        self.get_by_id(scope, id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.product_type.is_some() {
            sets.push("product_type = $product_type");
        }
        if input.model.is_some() {
            sets.push("model = $model");
        }
        match &input.serial_number {
            Some(Some(_)) => sets.push("serial_number = $serial_number"),
            Some(None) => sets.push("serial_number = NONE"),
            None => {}
        }
        if input.quantity.is_some() {
            sets.push("quantity = $quantity");
        }
        if input.price.is_some() {
            sets.push("price = $price");
        }
        if input.min_price.is_some() {
            sets.push("min_price = $min_price");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('product', $id) SET {}; {SELECT_ONE};",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(product_type) = input.product_type {
            builder = builder.bind(("product_type", product_type));
        }
        if let Some(model) = input.model {
            builder = builder.bind(("model", model));
        }
        if let Some(Some(serial_number)) = input.serial_number {
            builder = builder.bind(("serial_number", serial_number));
        }
        if let Some(quantity) = input.quantity {
            builder = builder.bind(("quantity", quantity));
        }
        if let Some(price) = input.price {
            builder = builder.bind(("price", price));
        }
        if let Some(min_price) = input.min_price {
            builder = builder.bind(("min_price", min_price));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("product name", e))?;
        let rows: Vec<ProductRow> = result.take(1).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn delete(&self, scope: &Predicate, id: Uuid) -> FieldOpsResult<()> {
        self.get_by_id(scope, id).await?;
        self.db
            .query("DELETE type::record('product', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list(
        &self,
        scope: &Predicate,
        query: ProductQuery,
    ) -> FieldOpsResult<PaginatedResult<Product>> {
        let scoped = scope_filter(scope, false)?;
        let mut conds = vec![scoped.clause];
        let needle = search_needle(query.search.as_deref());
        if needle.is_some() {
            conds.push(
                "(name_key CONTAINS $needle \
                 OR string::lowercase(model ?? '') CONTAINS $needle \
                 OR string::lowercase(serial_number ?? '') CONTAINS $needle)",
            );
        }
        if query.product_type.is_some() {
            conds.push("product_type = $product_type");
        }
        let filter = conds.join(" AND ");
        let page = query.pagination;

        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM product WHERE {filter} GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM product WHERE {filter} \
                 ORDER BY created_at DESC LIMIT $limit START $offset;"
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .bind(("needle", needle.unwrap_or_default()))
            .bind(("product_type", query.product_type.unwrap_or_default()))
            .bind(("limit", page.limit))
            .bind(("offset", page.offset))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<ProductRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ProductRow::try_into_product)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total: counts.first().map(|r| r.total).unwrap_or(0),
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn find_duplicate(
        &self,
        tenant_id: Uuid,
        name: &str,
        serial_number: Option<&str>,
        exclude: Option<Uuid>,
    ) -> FieldOpsResult<Option<DuplicateField>> {
        let serial = serial_number.map(str::trim).filter(|s| !s.is_empty());

        let mut result = self
            .db
            .query(
                "SELECT (name_key = $name_key) AS name_clash FROM product \
                 WHERE tenant_id = $tenant_id \
                 AND meta::id(id) != $exclude \
                 AND (name_key = $name_key \
                      OR ($serial != NONE AND serial_number = $serial))",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name_key", name.trim().to_lowercase()))
            .bind(("serial", serial.map(str::to_string)))
            .bind(("exclude", exclude.map(|id| id.to_string()).unwrap_or_default()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClashRow> = result.take(0).map_err(DbError::from)?;
        let clash = if rows.iter().any(|r| r.name_clash) {
            Some(DuplicateField::Name)
        } else if !rows.is_empty() {
            Some(DuplicateField::SerialNumber)
        } else {
            None
        };
        Ok(clash)
    }

    async fn reserve_stock(
        &self,
        scope: &Predicate,
        id: Uuid,
        quantity: i64,
    ) -> FieldOpsResult<Product> {
        if quantity <= 0 {
            return Err(StockError::InvalidQuantity.into());
        }
        self.get_by_id(scope, id).await?;

        // Guard and decrement are a single statement.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('product', $id) SET \
                 quantity -= $quantity, updated_at = time::now() \
                 WHERE quantity >= $quantity RETURN quantity",
            )
            .bind(("id", id.to_string()))
            .bind(("quantity", quantity))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let reserved: Vec<StockRow> = result.take(0).map_err(DbError::from)?;
        let current = self.fetch(id).await?;
        if reserved.is_empty() {
            debug!(
                product_id = %id,
                requested = quantity,
                available = current.quantity,
                "stock reservation refused"
            );
            return Err(StockError::InsufficientStock {
                available: current.quantity,
            }
            .into());
        }
        Ok(current)
    }

    async fn release_stock(&self, id: Uuid, quantity: i64) -> FieldOpsResult<()> {
        self.db
            .query(
                "UPDATE type::record('product', $id) SET \
                 quantity += $quantity, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("quantity", quantity))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn count(&self, scope: &Predicate) -> FieldOpsResult<u64> {
        let scoped = scope_filter(scope, false)?;
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM product WHERE {} GROUP ALL",
                scoped.clause
            ))
            .bind(("scope_tenant", scoped.tenant))
            .bind(("scope_agent", scoped.agent))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
