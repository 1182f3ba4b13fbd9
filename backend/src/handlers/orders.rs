//! HTTP handlers for order management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_order_manager, CurrentUser};
use crate::services::orders::{
    CreateOrderInput, OrderDetail, OrderListFilter, OrderService, OrderStats, OrderSummary,
    SyncOrdersInput, SyncOrdersResult,
};
use crate::AppState;
use shared::{DeliveryStatus, PaymentStatus};

/// Create an order (vendors and managers)
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db, state.hub);
    let order = service.create(&current_user.0, input).await?;
    Ok(Json(order))
}

/// List orders with optional filters
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<OrderListFilter>,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let service = OrderService::new(state.db, state.hub);
    let orders = service.list(&current_user.0, filter).await?;
    Ok(Json(orders))
}

/// Get one order with its items
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db, state.hub);
    let order = service.get(&current_user.0, order_id).await?;
    Ok(Json(order))
}

/// Body for a delivery status update
#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub delivery_status: DeliveryStatus,
}

/// Update the delivery status (order managers)
pub async fn update_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> AppResult<Json<OrderDetail>> {
    require_order_manager(&current_user.0)?;
    let service = OrderService::new(state.db, state.hub);
    let order = service
        .update_delivery_status(&current_user.0, order_id, input.delivery_status)
        .await?;
    Ok(Json(order))
}

/// Body for a payment status update
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentInput {
    pub payment_status: PaymentStatus,
}

/// Update the payment status (order managers)
pub async fn update_order_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdatePaymentInput>,
) -> AppResult<Json<OrderDetail>> {
    require_order_manager(&current_user.0)?;
    let service = OrderService::new(state.db, state.hub);
    let order = service
        .update_payment_status(&current_user.0, order_id, input.payment_status)
        .await?;
    Ok(Json(order))
}

/// Sync a batch of orders from the mobile app
pub async fn sync_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SyncOrdersInput>,
) -> AppResult<Json<SyncOrdersResult>> {
    let service = OrderService::new(state.db, state.hub);
    let result = service.sync(&current_user.0, input).await?;
    Ok(Json(result))
}

/// Orders still moving through the workflow
pub async fn pending_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let service = OrderService::new(state.db, state.hub);
    let orders = service.pending(&current_user.0).await?;
    Ok(Json(orders))
}

/// Unpaid orders
pub async fn unpaid_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let service = OrderService::new(state.db, state.hub);
    let orders = service.unpaid(&current_user.0).await?;
    Ok(Json(orders))
}

/// Orders to deliver today
pub async fn today_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let service = OrderService::new(state.db, state.hub);
    let orders = service.today(&current_user.0).await?;
    Ok(Json(orders))
}

/// Order statistics per status
pub async fn order_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<OrderStats>> {
    let service = OrderService::new(state.db, state.hub);
    let stats = service.stats(&current_user.0).await?;
    Ok(Json(stats))
}
