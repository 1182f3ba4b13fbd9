//! HTTP handlers for store sale endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sales::{
    CreateSaleInput, DailySalesSummary, SaleDetail, SaleListFilter, SaleService,
};
use crate::AppState;
use shared::Sale;

/// Record a sale; stock is decremented immediately
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db, state.hub);
    let sale = service.create(&current_user.0, input).await?;
    Ok(Json(sale))
}

/// List sales with optional filters
pub async fn list_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<SaleListFilter>,
) -> AppResult<Json<Vec<Sale>>> {
    let service = SaleService::new(state.db, state.hub);
    let sales = service.list(&current_user.0, filter).await?;
    Ok(Json(sales))
}

/// Get one sale with its items
pub async fn get_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db, state.hub);
    let sale = service.get(&current_user.0, sale_id).await?;
    Ok(Json(sale))
}

/// Aggregate figures for today's sales
pub async fn today_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DailySalesSummary>> {
    let service = SaleService::new(state.db, state.hub);
    let summary = service.today_summary(&current_user.0).await?;
    Ok(Json(summary))
}
