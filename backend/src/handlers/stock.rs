//! HTTP handlers for stock management endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::{require_stock_manager, CurrentUser};
use crate::services::stock::{
    MovementFilter, StockAdjustmentInput, StockAlerts, StockEntryInput, StockExitInput,
    StockMovementDetail, StockService,
};
use crate::AppState;
use shared::StockMovement;

/// Record a stock entry (stock managers)
pub async fn record_stock_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockEntryInput>,
) -> AppResult<Json<StockMovement>> {
    require_stock_manager(&current_user.0)?;
    let service = StockService::new(state.db, state.hub);
    let movement = service.record_entry(&current_user.0, input).await?;
    Ok(Json(movement))
}

/// Record a manual stock exit (stock managers)
pub async fn record_stock_exit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockExitInput>,
) -> AppResult<Json<StockMovement>> {
    require_stock_manager(&current_user.0)?;
    let service = StockService::new(state.db, state.hub);
    let movement = service.record_exit(&current_user.0, input).await?;
    Ok(Json(movement))
}

/// Record a stock adjustment (stock managers)
pub async fn record_stock_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockAdjustmentInput>,
) -> AppResult<Json<StockMovement>> {
    require_stock_manager(&current_user.0)?;
    let service = StockService::new(state.db, state.hub);
    let movement = service.record_adjustment(&current_user.0, input).await?;
    Ok(Json(movement))
}

/// Movement history (all authenticated users)
pub async fn list_stock_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<StockMovementDetail>>> {
    let service = StockService::new(state.db, state.hub);
    let movements = service.list_movements(filter).await?;
    Ok(Json(movements))
}

/// Stock alerts view (all authenticated users)
pub async fn stock_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<StockAlerts>> {
    let service = StockService::new(state.db, state.hub);
    let alerts = service.stock_alerts().await?;
    Ok(Json(alerts))
}

/// Response of an expiration check run
#[derive(Debug, Serialize)]
pub struct ExpirationCheckResponse {
    pub created: i32,
}

/// Create expiration notifications for soon-to-expire products
pub async fn check_expirations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ExpirationCheckResponse>> {
    require_stock_manager(&current_user.0)?;
    let service = StockService::new(state.db, state.hub);
    let created = service.check_expirations().await?;
    Ok(Json(ExpirationCheckResponse { created }))
}
