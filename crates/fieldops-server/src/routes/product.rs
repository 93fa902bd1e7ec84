//! Product catalogue.
//!
//! Older clients send `stock` where current ones send `quantity`; both
//! land in the same field here and nowhere else.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Router};
use fieldops_core::models::claims::Claims;
use fieldops_core::models::product::{DuplicateField, PRODUCT_TYPES, Product, UpdateProduct};
use fieldops_core::repository::{Pagination, ProductQuery};
use fieldops_core::service::NewProduct;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{Body, Id, Page, Params, Reply};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/types", get(types))
        .route("/products/check-duplicate", post(check_duplicate))
        .route("/products/{id}", get(fetch).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<u64>,
    limit: Option<u64>,
    search: Option<String>,
    #[serde(alias = "type")]
    product_type: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Params(params): Params<ListParams>,
) -> ApiResult<Reply<Page<Product>>> {
    let result = state
        .products
        .list(
            &claims,
            ProductQuery {
                search: params.search,
                product_type: params.product_type.filter(|t| !t.trim().is_empty()),
                pagination: Pagination::page(params.page, params.limit),
            },
        )
        .await?;
    Ok(Reply::ok("Products retrieved", result.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    tenant_id: Option<Uuid>,
    name: String,
    product_type: Option<String>,
    model: Option<String>,
    serial_number: Option<String>,
    #[serde(default, alias = "stock")]
    quantity: i64,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    min_price: f64,
}

async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Body(body): Body<CreateBody>,
) -> ApiResult<Reply<Product>> {
    let product = state
        .products
        .create(
            &claims,
            NewProduct {
                tenant_id: body.tenant_id,
                name: body.name,
                product_type: body.product_type,
                model: body.model,
                serial_number: body.serial_number,
                quantity: body.quantity,
                price: body.price,
                min_price: body.min_price,
            },
        )
        .await?;
    Ok(Reply::created("Product created", product))
}

async fn fetch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<Product>> {
    let product = state.products.get(&claims, id).await?;
    Ok(Reply::ok("Product retrieved", product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    name: Option<String>,
    product_type: Option<String>,
    model: Option<String>,
    #[serde(default, deserialize_with = "present")]
    serial_number: Option<Option<String>>,
    #[serde(alias = "stock")]
    quantity: Option<i64>,
    price: Option<f64>,
    min_price: Option<f64>,
}

/// Distinguish an explicit `null` from an absent key.
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
    Body(body): Body<UpdateBody>,
) -> ApiResult<Reply<Product>> {
    let product = state
        .products
        .update(
            &claims,
            id,
            UpdateProduct {
                name: body.name,
                product_type: body.product_type,
                model: body.model,
                serial_number: body.serial_number,
                quantity: body.quantity,
                price: body.price,
                min_price: body.min_price,
            },
        )
        .await?;
    Ok(Reply::ok("Product updated", product))
}

async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Id(id): Id,
) -> ApiResult<Reply<()>> {
    state.products.delete(&claims, id).await?;
    Ok(Reply::ok("Product deleted", ()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateBody {
    tenant_id: Option<Uuid>,
    name: String,
    serial_number: Option<String>,
    #[serde(alias = "productId")]
    exclude_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateReply {
    is_duplicate: bool,
    field: Option<DuplicateField>,
    message: Option<&'static str>,
}

async fn check_duplicate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Body(body): Body<DuplicateBody>,
) -> ApiResult<Reply<DuplicateReply>> {
    let field = state
        .products
        .check_duplicate(
            &claims,
            body.tenant_id,
            &body.name,
            body.serial_number.as_deref(),
            body.exclude_id,
        )
        .await?;
    Ok(Reply::ok(
        "Duplicate check complete",
        DuplicateReply {
            is_duplicate: field.is_some(),
            field,
            message: field.map(DuplicateField::message),
        },
    ))
}

#[derive(Debug, Serialize)]
struct ProductType {
    value: &'static str,
    label: &'static str,
}

async fn types() -> Reply<Vec<ProductType>> {
    let types = PRODUCT_TYPES
        .iter()
        .map(|&(value, label)| ProductType { value, label })
        .collect();
    Reply::ok("Product types retrieved", types)
}
