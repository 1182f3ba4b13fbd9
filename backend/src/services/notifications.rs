//! Notification dispatcher
//!
//! Decouples "something happened" from "who is listening": domain events
//! persist one notification row targeted at a user or a role, then push a
//! structured message to the matching realtime groups. Live delivery is
//! best-effort: the persisted row is the source of truth and remains
//! retrievable on the next poll or connect.

use serde_json::json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::realtime::NotificationHub;
use shared::{
    Notification, NotificationType, Order, Product, PushMessage, Role, SubscriptionKey,
};

const NOTIFICATION_COLUMNS: &str = "id, notification_type, title, message, recipient_role, \
     user_id, related_order_id, related_product_id, is_read, created_at";

// ============================================================================
// Domain event creators
//
// Callers run these inside the transaction of the triggering mutation so the
// notification row commits atomically with the event, and push the returned
// payload to the hub after commit.
// ============================================================================

/// Persist the notification for a freshly created order
pub async fn create_new_order_notification<'e>(
    db: impl PgExecutor<'e>,
    order: &Order,
) -> AppResult<Notification> {
    let message = format!(
        "Commande {} de {} - {} FCFA",
        order.order_number, order.client_name, order.total_price
    );
    insert_role_notification(
        db,
        NotificationType::NewOrder,
        "Nouvelle commande",
        &message,
        Role::GestionnaireCommandes,
        Some(order.id),
        None,
    )
    .await
}

/// Persist the notification for a delivered order
pub async fn create_order_delivered_notification<'e>(
    db: impl PgExecutor<'e>,
    order: &Order,
) -> AppResult<Notification> {
    let message = format!(
        "Commande {} a été livrée à {}",
        order.order_number, order.client_name
    );
    insert_role_notification(
        db,
        NotificationType::OrderDelivered,
        "Commande livrée",
        &message,
        Role::GestionnaireCommandes,
        Some(order.id),
        None,
    )
    .await
}

/// Persist a low-stock alert for the product, unless an unread one already
/// exists.
///
/// The suppression check and the insert are a single statement, so two
/// concurrent exits on the same product can never create duplicate alerts.
pub async fn create_low_stock_notification<'e>(
    db: impl PgExecutor<'e>,
    product: &Product,
) -> AppResult<Option<Notification>> {
    let message = format!(
        "{}: {} {} restants (seuil: {})",
        product.name,
        product.stock_quantity,
        product.unit.label(),
        product.min_stock_level
    );

    let notification = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (notification_type, title, message, recipient_role, related_product_id)
        SELECT $1, $2, $3, $4, $5
        WHERE NOT EXISTS (
            SELECT 1 FROM notifications
            WHERE notification_type = $1 AND related_product_id = $5 AND is_read = FALSE
        )
        RETURNING {NOTIFICATION_COLUMNS}
        "#,
    ))
    .bind(NotificationType::LowStock)
    .bind("Stock bas")
    .bind(&message)
    .bind(Role::GestionnaireStocks)
    .bind(product.id)
    .fetch_optional(db)
    .await?;

    Ok(notification)
}

/// Persist an expiration alert for the product, with the same unread
/// suppression as low-stock alerts.
pub async fn create_expiration_notification<'e>(
    db: impl PgExecutor<'e>,
    product: &Product,
) -> AppResult<Option<Notification>> {
    let Some(expiration_date) = product.expiration_date else {
        return Ok(None);
    };
    let message = format!(
        "{} expire le {}",
        product.name,
        expiration_date.format("%d/%m/%Y")
    );

    let notification = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (notification_type, title, message, recipient_role, related_product_id)
        SELECT $1, $2, $3, $4, $5
        WHERE NOT EXISTS (
            SELECT 1 FROM notifications
            WHERE notification_type = $1 AND related_product_id = $5 AND is_read = FALSE
        )
        RETURNING {NOTIFICATION_COLUMNS}
        "#,
    ))
    .bind(NotificationType::Expiration)
    .bind("Produit bientôt périmé")
    .bind(&message)
    .bind(Role::GestionnaireStocks)
    .bind(product.id)
    .fetch_optional(db)
    .await?;

    Ok(notification)
}

async fn insert_role_notification<'e>(
    db: impl PgExecutor<'e>,
    notification_type: NotificationType,
    title: &str,
    message: &str,
    recipient_role: Role,
    related_order_id: Option<Uuid>,
    related_product_id: Option<Uuid>,
) -> AppResult<Notification> {
    let notification = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications
            (notification_type, title, message, recipient_role, related_order_id, related_product_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {NOTIFICATION_COLUMNS}
        "#,
    ))
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .bind(recipient_role)
    .bind(related_order_id)
    .bind(related_product_id)
    .fetch_one(db)
    .await?;

    Ok(notification)
}

// ============================================================================
// Realtime payloads
// ============================================================================

/// Payload of a notification about an order
pub fn order_event_payload(notification: &Notification, order: &Order) -> serde_json::Value {
    json!({
        "id": notification.id,
        "type": notification.notification_type,
        "title": notification.title,
        "message": notification.message,
        "order_id": order.id,
        "order_number": order.order_number,
        "priority": order.priority,
        "created_at": notification.created_at,
    })
}

/// Payload of a notification about a product
pub fn stock_event_payload(notification: &Notification, product: &Product) -> serde_json::Value {
    json!({
        "id": notification.id,
        "type": notification.notification_type,
        "title": notification.title,
        "message": notification.message,
        "product_id": product.id,
        "product_name": product.name,
        "stock_quantity": product.stock_quantity,
        "created_at": notification.created_at,
    })
}

/// Payload of an `order_update` push
pub fn order_update_payload(order: &Order) -> serde_json::Value {
    json!({
        "order_id": order.id,
        "order_number": order.order_number,
        "delivery_status": order.delivery_status,
        "payment_status": order.payment_status,
        "priority": order.priority,
        "total_price": order.total_price,
        "updated_at": order.updated_at,
    })
}

// ============================================================================
// Service
// ============================================================================

/// Notification service: read-state management and realtime pushes
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    hub: NotificationHub,
}

impl NotificationService {
    pub fn new(db: PgPool, hub: NotificationHub) -> Self {
        Self { db, hub }
    }

    /// Notifications addressed to the user or the user's role
    pub async fn list(
        &self,
        user: &AuthUser,
        unread_only: bool,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let notifications = if unread_only {
            sqlx::query_as::<_, Notification>(&format!(
                r#"
                SELECT {NOTIFICATION_COLUMNS}
                FROM notifications
                WHERE (user_id = $1 OR recipient_role = $2) AND is_read = FALSE
                ORDER BY created_at DESC
                LIMIT $3
                "#,
            ))
            .bind(user.user_id)
            .bind(user.role)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, Notification>(&format!(
                r#"
                SELECT {NOTIFICATION_COLUMNS}
                FROM notifications
                WHERE (user_id = $1 OR recipient_role = $2)
                ORDER BY created_at DESC
                LIMIT $3
                "#,
            ))
            .bind(user.user_id)
            .bind(user.role)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        };

        Ok(notifications)
    }

    /// Count of unread notifications addressed to the user or their role
    pub async fn unread_count(&self, user: &AuthUser) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE is_read = FALSE AND (user_id = $1 OR recipient_role = $2)
            "#,
        )
        .bind(user.user_id)
        .bind(user.role)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Flip the read flag. Idempotent: marking an already-read or unknown
    /// notification is a no-op returning `false`.
    pub async fn mark_read(&self, user: &AuthUser, notification_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND is_read = FALSE AND (user_id = $2 OR recipient_role = $3)
            "#,
        )
        .bind(notification_id)
        .bind(user.user_id)
        .bind(user.role)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every notification addressed to the user or their role as read
    pub async fn mark_all_read(&self, user: &AuthUser) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE is_read = FALSE AND (user_id = $1 OR recipient_role = $2)
            "#,
        )
        .bind(user.user_id)
        .bind(user.role)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() as i64)
    }

    // ========================================================================
    // Realtime pushes (fire-and-forget)
    // ========================================================================

    pub fn push_notification(&self, targets: &[SubscriptionKey], data: serde_json::Value) {
        let reached = self
            .hub
            .publish_many(targets, &PushMessage::Notification { data });
        tracing::debug!(reached, "notification pushed");
    }

    pub fn push_order_update(&self, targets: &[SubscriptionKey], data: serde_json::Value) {
        let reached = self
            .hub
            .publish_many(targets, &PushMessage::OrderUpdate { data });
        tracing::debug!(reached, "order update pushed");
    }

    pub fn push_stock_alert(&self, targets: &[SubscriptionKey], data: serde_json::Value) {
        let reached = self
            .hub
            .publish_many(targets, &PushMessage::StockAlert { data });
        tracing::debug!(reached, "stock alert pushed");
    }

    /// Push a persisted low-stock alert to the stock managers and admins,
    /// both as a notification and as a stock alert frame.
    pub fn push_low_stock(&self, notification: &Notification, product: &Product) {
        let targets = [
            SubscriptionKey::Role(Role::GestionnaireStocks),
            SubscriptionKey::Role(Role::Admin),
        ];
        let payload = stock_event_payload(notification, product);
        self.push_notification(&targets, payload.clone());
        self.push_stock_alert(&targets, payload);
    }
}
