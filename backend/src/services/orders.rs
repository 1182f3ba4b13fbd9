//! Order lifecycle engine
//!
//! Owns the order aggregate (order + line items) and the delivery/payment
//! state machine. Side effects of a status change are orchestrated
//! explicitly here: reaching `livree` decrements stock for every line item
//! and emits the delivered notification inside the same transaction, then
//! pushes realtime updates after commit.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::realtime::NotificationHub;
use crate::services::notifications::{self, NotificationService};
use crate::services::{audit, stock};
use shared::{
    next_order_number, order_number_prefix, AuditAction, DeliveryStatus, Notification, Order,
    OrderItem, PaymentStatus, Priority, Product, Role, SubscriptionKey, Unit,
};

const ORDER_COLUMNS: &str = "id, order_number, local_id, client_name, client_phone, \
     delivery_address, delivery_date, delivery_status, payment_status, priority, total_price, \
     notes, created_by, created_at, updated_at, synced_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price, subtotal, created_at";

// ============================================================================
// Inputs and views
// ============================================================================

/// Requested line item: the unit price is snapshotted server-side
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Input for creating an order
#[derive(Debug, Clone, Deserialize, validator::Validate)]
pub struct CreateOrderInput {
    /// Client-assigned identifier for offline sync; generated when absent
    pub local_id: Option<Uuid>,
    #[validate(length(min = 1, message = "client name is required"))]
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub delivery_address: String,
    pub delivery_date: chrono::NaiveDate,
    pub priority: Option<Priority>,
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<OrderItemRequest>,
}

/// Line item with product details, for API responses
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_unit: Unit,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Order with its line items
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// Lightweight row for order listings
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub client_name: String,
    pub client_phone: String,
    pub delivery_date: chrono::NaiveDate,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub priority: Priority,
    pub total_price: Decimal,
    pub items_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Filters for order listings
#[derive(Debug, Default, Deserialize)]
pub struct OrderListFilter {
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub priority: Option<Priority>,
    pub delivery_date: Option<chrono::NaiveDate>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

/// Per-status counts
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderStats {
    pub total: i64,
    pub nouvelle: i64,
    pub en_preparation: i64,
    pub en_cours: i64,
    pub livree: i64,
    pub annulee: i64,
    pub payee: i64,
    pub non_payee: i64,
    pub haute_priorite: i64,
}

/// Batch of orders from the mobile app
#[derive(Debug, Deserialize)]
pub struct SyncOrdersInput {
    pub orders: Vec<CreateOrderInput>,
}

/// One rejected order of a sync batch
#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub index: usize,
    pub error: String,
}

/// Outcome of a sync batch: every order is processed independently
#[derive(Debug, Serialize)]
pub struct SyncOrdersResult {
    pub synced: usize,
    pub orders: Vec<OrderDetail>,
    pub failed: Vec<SyncFailure>,
}

// ============================================================================
// Service
// ============================================================================

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    hub: NotificationHub,
}

impl OrderService {
    pub fn new(db: PgPool, hub: NotificationHub) -> Self {
        Self { db, hub }
    }

    fn notifications(&self) -> NotificationService {
        NotificationService::new(self.db.clone(), self.hub.clone())
    }

    /// Create an order with its line items as one atomic unit.
    ///
    /// The order number scan races with concurrent creations; a collision
    /// trips the unique constraint and the whole transaction is retried
    /// once with a recomputed number.
    pub async fn create(&self, user: &AuthUser, input: CreateOrderInput) -> AppResult<OrderDetail> {
        validator::Validate::validate(&input)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        shared::validate_has_items(&input.items).map_err(|_| AppError::Validation {
            field: "items".to_string(),
            message: "The order must contain at least one item".to_string(),
            message_fr: "La commande doit contenir au moins un produit".to_string(),
        })?;

        let mut attempt = 0;
        let (detail, notification) = loop {
            match self.try_create(user, &input).await {
                Err(err) if err.is_unique_violation() && attempt == 0 => {
                    tracing::warn!("Order number collision, retrying with a fresh sequence");
                    attempt += 1;
                }
                other => break other?,
            }
        };

        let service = self.notifications();
        service.push_notification(
            &[
                SubscriptionKey::Role(Role::GestionnaireCommandes),
                SubscriptionKey::Role(Role::Admin),
            ],
            notifications::order_event_payload(&notification, &detail.order),
        );

        Ok(detail)
    }

    async fn try_create(
        &self,
        user: &AuthUser,
        input: &CreateOrderInput,
    ) -> AppResult<(OrderDetail, Notification)> {
        let mut tx = self.db.begin().await?;

        // Resolve products and snapshot their current prices
        let mut lines: Vec<(Product, i32)> = Vec::with_capacity(input.items.len());
        let mut total = Decimal::ZERO;
        for item in &input.items {
            shared::validate_item_quantity(item.quantity).map_err(|message_fr| {
                AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity must be positive".to_string(),
                    message_fr: message_fr.to_string(),
                }
            })?;

            let product = sqlx::query_as::<_, Product>(
                "SELECT id, name, description, unit_price, stock_quantity, unit, barcode, \
                 min_stock_level, expiration_date, is_active, created_at, updated_at \
                 FROM products WHERE id = $1 AND is_active = TRUE",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Validation {
                field: "product_id".to_string(),
                message: "Product not found or inactive".to_string(),
                message_fr: "Produit non trouvé ou inactif".to_string(),
            })?;

            total += product.unit_price * Decimal::from(item.quantity);
            lines.push((product, item.quantity));
        }

        let order_number = next_number_for_today(&mut tx).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
                (order_number, local_id, client_name, client_phone, delivery_address,
                 delivery_date, payment_status, priority, total_price, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(&order_number)
        .bind(input.local_id.unwrap_or_else(Uuid::new_v4))
        .bind(&input.client_name)
        .bind(&input.client_phone)
        .bind(&input.delivery_address)
        .bind(input.delivery_date)
        .bind(input.payment_status.unwrap_or(PaymentStatus::NonPayee))
        .bind(input.priority.unwrap_or(Priority::Moyenne))
        .bind(total)
        .bind(&input.notes)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        for (product, quantity) in &lines {
            let subtotal = product.unit_price * Decimal::from(*quantity);
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price, subtotal) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order.id)
            .bind(product.id)
            .bind(quantity)
            .bind(product.unit_price)
            .bind(subtotal)
            .execute(&mut *tx)
            .await?;
        }

        audit::record(
            &mut *tx,
            Some(user.user_id),
            AuditAction::Create,
            "Order",
            &order.id.to_string(),
            None,
            Some(json!({
                "order_number": order.order_number,
                "total_price": order.total_price,
            })),
        )
        .await?;

        let notification =
            notifications::create_new_order_notification(&mut *tx, &order).await?;

        let items = fetch_item_details(&mut *tx, order.id).await?;

        tx.commit().await?;

        Ok((OrderDetail { order, items }, notification))
    }

    /// Advance the delivery status.
    ///
    /// The order row is locked for the whole transaction, so concurrent
    /// updates serialize and the delivered transition fires its stock
    /// decrement exactly once; a repeated `livree` update is a no-op.
    pub async fn update_delivery_status(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        new_status: DeliveryStatus,
    ) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut tx, order_id).await?;

        if order.is_cancelled() {
            return Err(AppError::Conflict {
                resource: "delivery_status".to_string(),
                message: "A cancelled order can no longer be modified".to_string(),
                message_fr: "Impossible de modifier une commande annulée".to_string(),
            });
        }
        if !order.delivery_status.can_transition_to(new_status) {
            return Err(AppError::InvalidStateTransition(format!(
                "{} → {}",
                order.delivery_status.as_str(),
                new_status.as_str()
            )));
        }

        let previous_status = order.delivery_status;

        let updated = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET delivery_status = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {ORDER_COLUMNS}",
        ))
        .bind(new_status)
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            Some(user.user_id),
            AuditAction::Update,
            "Order",
            &updated.id.to_string(),
            Some(json!({ "delivery_status": previous_status })),
            Some(json!({ "delivery_status": new_status })),
        )
        .await?;

        // Stock is decremented exactly once, on the transition that first
        // reaches `livree`; the delivered event follows the stock change.
        let mut delivered_notification = None;
        let mut low_stock_alerts = Vec::new();
        if previous_status != DeliveryStatus::Livree && new_status == DeliveryStatus::Livree {
            let items = fetch_items(&mut *tx, order_id).await?;
            let (_movements, alerts) =
                stock::decrement_stock_for_order(&mut tx, &updated, &items, user.user_id).await?;
            low_stock_alerts = alerts;
            delivered_notification =
                Some(notifications::create_order_delivered_notification(&mut *tx, &updated).await?);
        }

        let items = fetch_item_details(&mut *tx, order_id).await?;

        tx.commit().await?;

        // Realtime pushes are fire-and-forget relative to the response
        let service = self.notifications();
        service.push_order_update(
            &[
                SubscriptionKey::Role(Role::GestionnaireCommandes),
                SubscriptionKey::Role(Role::Admin),
                SubscriptionKey::User(updated.created_by),
            ],
            notifications::order_update_payload(&updated),
        );
        if let Some(notification) = delivered_notification {
            service.push_notification(
                &[SubscriptionKey::Role(Role::GestionnaireCommandes)],
                notifications::order_event_payload(&notification, &updated),
            );
        }
        for (notification, product) in low_stock_alerts {
            service.push_low_stock(&notification, &product);
        }

        Ok(OrderDetail {
            order: updated,
            items,
        })
    }

    /// Update the payment status; no stock side effects
    pub async fn update_payment_status(
        &self,
        user: &AuthUser,
        order_id: Uuid,
        new_status: PaymentStatus,
    ) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;

        let order = lock_order(&mut tx, order_id).await?;
        let previous_status = order.payment_status;

        let updated = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET payment_status = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {ORDER_COLUMNS}",
        ))
        .bind(new_status)
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            Some(user.user_id),
            AuditAction::Update,
            "Order",
            &updated.id.to_string(),
            Some(json!({ "payment_status": previous_status })),
            Some(json!({ "payment_status": new_status })),
        )
        .await?;

        let items = fetch_item_details(&mut *tx, order_id).await?;

        tx.commit().await?;

        self.notifications().push_order_update(
            &[
                SubscriptionKey::Role(Role::GestionnaireCommandes),
                SubscriptionKey::Role(Role::Admin),
                SubscriptionKey::User(updated.created_by),
            ],
            notifications::order_update_payload(&updated),
        );

        Ok(OrderDetail {
            order: updated,
            items,
        })
    }

    /// Apply a batch of creations from the mobile app.
    ///
    /// Every order commits independently: one rejected order is reported in
    /// `failed` and never rolls back or blocks its siblings.
    pub async fn sync(
        &self,
        user: &AuthUser,
        input: SyncOrdersInput,
    ) -> AppResult<SyncOrdersResult> {
        let mut orders = Vec::new();
        let mut failed = Vec::new();

        for (index, request) in input.orders.into_iter().enumerate() {
            match self.create(user, request).await {
                Ok(mut detail) => {
                    let synced = sqlx::query_as::<_, Order>(&format!(
                        "UPDATE orders SET synced_at = NOW() WHERE id = $1 \
                         RETURNING {ORDER_COLUMNS}",
                    ))
                    .bind(detail.order.id)
                    .fetch_one(&self.db)
                    .await?;
                    detail.order = synced;
                    orders.push(detail);
                }
                Err(err) => {
                    tracing::warn!(index, "Sync rejected an order: {err}");
                    failed.push(SyncFailure {
                        index,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(SyncOrdersResult {
            synced: orders.len(),
            orders,
            failed,
        })
    }

    /// Fetch one order with its items. Vendors only see their own orders.
    pub async fn get(&self, user: &AuthUser, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1",
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if user.is_vendor() && order.created_by != user.user_id {
            return Err(AppError::NotFound("Order".to_string()));
        }

        let items = fetch_item_details(&self.db, order_id).await?;

        Ok(OrderDetail { order, items })
    }

    /// List orders, highest priority first. Vendors only see their own.
    pub async fn list(
        &self,
        user: &AuthUser,
        filter: OrderListFilter,
    ) -> AppResult<Vec<OrderSummary>> {
        let summaries = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT}
            WHERE ($1::uuid IS NULL OR o.created_by = $1)
              AND ($2::delivery_status IS NULL OR o.delivery_status = $2)
              AND ($3::payment_status IS NULL OR o.payment_status = $3)
              AND ($4::order_priority IS NULL OR o.priority = $4)
              AND ($5::date IS NULL OR o.delivery_date = $5)
              AND ($6::date IS NULL OR o.created_at::date >= $6)
              AND ($7::date IS NULL OR o.created_at::date <= $7)
            ORDER BY o.priority DESC, o.created_at DESC",
        ))
        .bind(vendor_scope(user))
        .bind(filter.delivery_status)
        .bind(filter.payment_status)
        .bind(filter.priority)
        .bind(filter.delivery_date)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(summaries)
    }

    /// Orders still moving through the workflow
    pub async fn pending(&self, user: &AuthUser) -> AppResult<Vec<OrderSummary>> {
        let summaries = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT}
            WHERE ($1::uuid IS NULL OR o.created_by = $1)
              AND o.delivery_status NOT IN ('livree', 'annulee')
            ORDER BY o.priority DESC, o.created_at DESC",
        ))
        .bind(vendor_scope(user))
        .fetch_all(&self.db)
        .await?;

        Ok(summaries)
    }

    /// Unpaid orders, cancelled ones excluded
    pub async fn unpaid(&self, user: &AuthUser) -> AppResult<Vec<OrderSummary>> {
        let summaries = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT}
            WHERE ($1::uuid IS NULL OR o.created_by = $1)
              AND o.payment_status = 'non_payee'
              AND o.delivery_status <> 'annulee'
            ORDER BY o.priority DESC, o.created_at DESC",
        ))
        .bind(vendor_scope(user))
        .fetch_all(&self.db)
        .await?;

        Ok(summaries)
    }

    /// Orders to deliver today
    pub async fn today(&self, user: &AuthUser) -> AppResult<Vec<OrderSummary>> {
        let summaries = sqlx::query_as::<_, OrderSummary>(&format!(
            "{SUMMARY_SELECT}
            WHERE ($1::uuid IS NULL OR o.created_by = $1)
              AND o.delivery_date = CURRENT_DATE
            ORDER BY o.priority DESC, o.created_at DESC",
        ))
        .bind(vendor_scope(user))
        .fetch_all(&self.db)
        .await?;

        Ok(summaries)
    }

    /// Order statistics per status
    pub async fn stats(&self, user: &AuthUser) -> AppResult<OrderStats> {
        let stats = sqlx::query_as::<_, OrderStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE delivery_status = 'nouvelle') AS nouvelle,
                   COUNT(*) FILTER (WHERE delivery_status = 'en_preparation') AS en_preparation,
                   COUNT(*) FILTER (WHERE delivery_status = 'en_cours') AS en_cours,
                   COUNT(*) FILTER (WHERE delivery_status = 'livree') AS livree,
                   COUNT(*) FILTER (WHERE delivery_status = 'annulee') AS annulee,
                   COUNT(*) FILTER (WHERE payment_status = 'payee') AS payee,
                   COUNT(*) FILTER (WHERE payment_status = 'non_payee') AS non_payee,
                   COUNT(*) FILTER (WHERE priority = 'haute') AS haute_priorite
            FROM orders
            WHERE ($1::uuid IS NULL OR created_by = $1)
            "#,
        )
        .bind(vendor_scope(user))
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }
}

const SUMMARY_SELECT: &str = "SELECT o.id, o.order_number, o.client_name, o.client_phone, \
     o.delivery_date, o.delivery_status, o.payment_status, o.priority, o.total_price, \
     (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS items_count, \
     o.created_at \
     FROM orders o";

/// Vendors are scoped to their own orders; managers and admins see all
fn vendor_scope(user: &AuthUser) -> Option<Uuid> {
    user.is_vendor().then_some(user.user_id)
}

/// Lock the order row so concurrent status updates serialize
async fn lock_order(tx: &mut Transaction<'_, Postgres>, order_id: Uuid) -> AppResult<Order> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE",
    ))
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// Highest existing number under today's prefix, incremented
async fn next_number_for_today(tx: &mut Transaction<'_, Postgres>) -> AppResult<String> {
    let prefix = order_number_prefix(Utc::now().date_naive());
    let last: Option<String> = sqlx::query_scalar(
        "SELECT order_number FROM orders WHERE order_number LIKE $1 \
         ORDER BY order_number DESC LIMIT 1",
    )
    .bind(format!("{prefix}%"))
    .fetch_optional(&mut **tx)
    .await?;

    Ok(next_order_number(&prefix, last.as_deref()))
}

async fn fetch_items<'e>(
    db: impl sqlx::PgExecutor<'e>,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at",
    ))
    .bind(order_id)
    .fetch_all(db)
    .await?;

    Ok(items)
}

async fn fetch_item_details<'e>(
    db: impl sqlx::PgExecutor<'e>,
    order_id: Uuid,
) -> AppResult<Vec<OrderItemDetail>> {
    let items = sqlx::query_as::<_, OrderItemDetail>(
        r#"
        SELECT oi.id, oi.product_id, p.name AS product_name, p.unit AS product_unit,
               oi.quantity, oi.unit_price, oi.subtotal
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = $1
        ORDER BY oi.created_at
        "#,
    )
    .bind(order_id)
    .fetch_all(db)
    .await?;

    Ok(items)
}
