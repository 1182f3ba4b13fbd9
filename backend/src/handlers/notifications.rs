//! HTTP handlers for notification endpoints
//!
//! The same read-state operations are reachable over the WebSocket; these
//! routes serve clients polling between connections.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::NotificationService;
use crate::AppState;
use shared::Notification;

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

/// Notifications addressed to the current user or their role
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let service = NotificationService::new(state.db, state.hub);
    let notifications = service
        .list(
            &current_user.0,
            query.unread_only.unwrap_or(false),
            query.limit.unwrap_or(50),
        )
        .await?;
    Ok(Json(notifications))
}

/// Unread count response
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// Unread notification count
pub async fn unread_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let service = NotificationService::new(state.db, state.hub);
    let count = service.unread_count(&current_user.0).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Mark one notification as read (idempotent)
pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = NotificationService::new(state.db, state.hub);
    service.mark_read(&current_user.0, notification_id).await?;
    Ok(Json(()))
}

/// Mark-all-read response
#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub marked_count: i64,
}

/// Mark every notification addressed to the user as read
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let service = NotificationService::new(state.db, state.hub);
    let marked_count = service.mark_all_read(&current_user.0).await?;
    Ok(Json(MarkAllReadResponse { marked_count }))
}
