//! Product catalog and order read endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{Order, Product};
use crate::error::{Error, Result};
use crate::http::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    request
        .validate()
        .map_err(|e| Error::Validation(e.to_string().replace('\n', "; ")))?;
    if request.price < Decimal::ZERO {
        return Err(Error::Validation("price cannot be negative".into()));
    }
    if request.stock < 0 {
        return Err(Error::Validation("stock cannot be negative".into()));
    }
    let product = state
        .products
        .insert(Product::new(request.name, request.description, request.price, request.stock))
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.products.list().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    state
        .products
        .find(id)
        .await?
        .map(Json)
        .ok_or(Error::NotFound("Product"))
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders.list().await?))
}

pub async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    state
        .orders
        .find(id)
        .await?
        .map(Json)
        .ok_or(Error::NotFound("Order"))
}
