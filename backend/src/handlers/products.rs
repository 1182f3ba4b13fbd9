//! HTTP handlers for product catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_stock_manager, CurrentUser};
use crate::services::products::{CreateProductInput, ProductService, UpdateProductInput};
use crate::AppState;
use shared::Product;

/// Query parameters for product listings
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub include_inactive: Option<bool>,
}

/// List products (all authenticated users)
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service
        .list(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(products))
}

/// Get one product
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get(product_id).await?;
    Ok(Json(product))
}

/// Create a product (stock managers)
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    require_stock_manager(&current_user.0)?;
    let service = ProductService::new(state.db);
    let product = service.create(input).await?;
    Ok(Json(product))
}

/// Update a product (stock managers)
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    require_stock_manager(&current_user.0)?;
    let service = ProductService::new(state.db);
    let product = service.update(product_id, input).await?;
    Ok(Json(product))
}
