//! Inventory ledger
//!
//! Owns the current stock level per product and the append-only movement
//! history. Every operation locks the product row, writes the new stock
//! level and inserts the movement record in the same transaction: no code
//! path mutates `products.stock_quantity` without its movement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::realtime::NotificationHub;
use crate::services::notifications::{self, NotificationService};
use shared::{MovementType, Notification, Order, OrderItem, Product, StockMovement};

const MOVEMENT_COLUMNS: &str = "id, product_id, movement_type, quantity, previous_quantity, \
     new_quantity, order_id, reason, user_id, created_at";

const PRODUCT_COLUMNS: &str = "id, name, description, unit_price, stock_quantity, unit, \
     barcode, min_stock_level, expiration_date, is_active, created_at, updated_at";

// ============================================================================
// Ledger operations
//
// Free functions over an open transaction, so the order lifecycle engine and
// the sales path can fold stock changes into their own transaction boundary.
// ============================================================================

/// Lock and fetch the product row for a stock mutation
async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> AppResult<Product> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE",
    ))
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Write the new stock level and its movement record
async fn apply_movement(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
    movement_type: MovementType,
    quantity: i32,
    user_id: Uuid,
    reason: &str,
    order_id: Option<Uuid>,
) -> AppResult<(StockMovement, Product)> {
    let new_quantity = product.stock_quantity + quantity;

    let updated = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET stock_quantity = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING {PRODUCT_COLUMNS}",
    ))
    .bind(new_quantity)
    .bind(product.id)
    .fetch_one(&mut **tx)
    .await?;

    let movement = sqlx::query_as::<_, StockMovement>(&format!(
        r#"
        INSERT INTO stock_movements
            (product_id, movement_type, quantity, previous_quantity, new_quantity, order_id, reason, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {MOVEMENT_COLUMNS}
        "#,
    ))
    .bind(product.id)
    .bind(movement_type)
    .bind(quantity)
    .bind(product.stock_quantity)
    .bind(new_quantity)
    .bind(order_id)
    .bind(reason)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok((movement, updated))
}

/// Stock entry: `new = old + quantity`
pub async fn create_stock_entry(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
    user_id: Uuid,
    reason: Option<&str>,
) -> AppResult<(StockMovement, Product)> {
    validate_quantity(quantity)?;
    let product = lock_product(tx, product_id).await?;
    apply_movement(
        tx,
        &product,
        MovementType::Entree,
        quantity,
        user_id,
        reason.unwrap_or("Entrée de stock"),
        None,
    )
    .await
}

/// Stock exit: `new = old - quantity`, stored movement quantity negated.
///
/// Stock may go negative; the ledger enforces no floor and callers needing
/// one must pre-validate. When the resulting level reaches the product's minimum
/// threshold a low-stock notification is inserted in the same transaction,
/// suppressed while an unread one exists for the product.
pub async fn create_stock_exit(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
    user_id: Uuid,
    reason: Option<&str>,
    order: Option<&Order>,
) -> AppResult<(StockMovement, Product, Option<Notification>)> {
    validate_quantity(quantity)?;
    let product = lock_product(tx, product_id).await?;
    let (movement, updated) = apply_movement(
        tx,
        &product,
        MovementType::Sortie,
        -quantity,
        user_id,
        reason.unwrap_or("Sortie de stock"),
        order.map(|o| o.id),
    )
    .await?;

    let alert = if updated.is_low_stock() {
        notifications::create_low_stock_notification(&mut **tx, &updated).await?
    } else {
        None
    };

    Ok((movement, updated, alert))
}

/// Stock adjustment to an absolute target level; the delta may be positive,
/// negative or zero.
pub async fn create_stock_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    new_quantity: i32,
    user_id: Uuid,
    reason: Option<&str>,
) -> AppResult<(StockMovement, Product)> {
    if new_quantity < 0 {
        return Err(AppError::Validation {
            field: "new_quantity".to_string(),
            message: "Target quantity cannot be negative".to_string(),
            message_fr: "La quantité cible ne peut pas être négative".to_string(),
        });
    }
    let product = lock_product(tx, product_id).await?;
    apply_movement(
        tx,
        &product,
        MovementType::Ajustement,
        new_quantity - product.stock_quantity,
        user_id,
        reason.unwrap_or("Ajustement inventaire"),
        None,
    )
    .await
}

/// Decrement stock for every line item of a delivered order.
///
/// Runs inside the caller's transaction; each item triggers its own
/// independent low-stock check. Returns the movements plus the low-stock
/// notifications created, with the product state to build push payloads.
pub async fn decrement_stock_for_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
    items: &[OrderItem],
    user_id: Uuid,
) -> AppResult<(Vec<StockMovement>, Vec<(Notification, Product)>)> {
    let mut movements = Vec::with_capacity(items.len());
    let mut alerts = Vec::new();
    let reason = format!("Livraison commande {}", order.order_number);

    for item in items {
        let (movement, product, alert) = create_stock_exit(
            tx,
            item.product_id,
            item.quantity,
            user_id,
            Some(&reason),
            Some(order),
        )
        .await?;
        movements.push(movement);
        if let Some(notification) = alert {
            alerts.push((notification, product));
        }
    }

    Ok((movements, alerts))
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    shared::validate_item_quantity(quantity).map_err(|message_fr| AppError::Validation {
        field: "quantity".to_string(),
        message: "Quantity must be positive".to_string(),
        message_fr: message_fr.to_string(),
    })
}

// ============================================================================
// Inputs and views
// ============================================================================

/// Input for recording a stock entry
#[derive(Debug, Deserialize)]
pub struct StockEntryInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: Option<String>,
    /// New expiration date of the restocked batch, if any
    pub expiration_date: Option<NaiveDate>,
}

/// Input for recording a manual stock exit
#[derive(Debug, Deserialize)]
pub struct StockExitInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: Option<String>,
}

/// Input for a stock adjustment
#[derive(Debug, Deserialize)]
pub struct StockAdjustmentInput {
    pub product_id: Uuid,
    pub new_quantity: i32,
    pub reason: Option<String>,
}

/// Filters for the movement history
#[derive(Debug, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

/// Movement with its product name, for history listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockMovementDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub order_id: Option<Uuid>,
    pub reason: String,
    pub user_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Stock alerts view: products needing attention
#[derive(Debug, Serialize)]
pub struct StockAlerts {
    pub low_stock: Vec<Product>,
    pub expiring: Vec<Product>,
    pub out_of_stock: Vec<Product>,
    pub counts: StockAlertCounts,
}

#[derive(Debug, Serialize)]
pub struct StockAlertCounts {
    pub low_stock: usize,
    pub expiring: usize,
    pub out_of_stock: usize,
}

// ============================================================================
// Service
// ============================================================================

/// Stock service wrapping the ledger operations in their own transaction
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    hub: NotificationHub,
}

impl StockService {
    pub fn new(db: PgPool, hub: NotificationHub) -> Self {
        Self { db, hub }
    }

    fn notifications(&self) -> NotificationService {
        NotificationService::new(self.db.clone(), self.hub.clone())
    }

    /// Record a stock entry
    pub async fn record_entry(
        &self,
        user: &AuthUser,
        input: StockEntryInput,
    ) -> AppResult<StockMovement> {
        let mut tx = self.db.begin().await?;

        let (movement, _product) = create_stock_entry(
            &mut tx,
            input.product_id,
            input.quantity,
            user.user_id,
            input.reason.as_deref(),
        )
        .await?;

        if let Some(expiration_date) = input.expiration_date {
            sqlx::query("UPDATE products SET expiration_date = $1, updated_at = NOW() WHERE id = $2")
                .bind(expiration_date)
                .bind(input.product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(movement)
    }

    /// Record a manual stock exit
    pub async fn record_exit(
        &self,
        user: &AuthUser,
        input: StockExitInput,
    ) -> AppResult<StockMovement> {
        let mut tx = self.db.begin().await?;
        let (movement, product, alert) = create_stock_exit(
            &mut tx,
            input.product_id,
            input.quantity,
            user.user_id,
            input.reason.as_deref(),
            None,
        )
        .await?;
        tx.commit().await?;

        if let Some(notification) = alert {
            self.notifications().push_low_stock(&notification, &product);
        }

        Ok(movement)
    }

    /// Record a stock adjustment
    pub async fn record_adjustment(
        &self,
        user: &AuthUser,
        input: StockAdjustmentInput,
    ) -> AppResult<StockMovement> {
        let mut tx = self.db.begin().await?;
        let (movement, _product) = create_stock_adjustment(
            &mut tx,
            input.product_id,
            input.new_quantity,
            user.user_id,
            input.reason.as_deref(),
        )
        .await?;
        tx.commit().await?;
        Ok(movement)
    }

    /// Movement history, most recent first
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
    ) -> AppResult<Vec<StockMovementDetail>> {
        let movements = sqlx::query_as::<_, StockMovementDetail>(
            r#"
            SELECT sm.id, sm.product_id, p.name AS product_name, sm.movement_type,
                   sm.quantity, sm.previous_quantity, sm.new_quantity,
                   sm.order_id, sm.reason, sm.user_id, sm.created_at
            FROM stock_movements sm
            JOIN products p ON p.id = sm.product_id
            WHERE ($1::uuid IS NULL OR sm.product_id = $1)
              AND ($2::movement_type IS NULL OR sm.movement_type = $2)
              AND ($3::date IS NULL OR sm.created_at::date >= $3)
              AND ($4::date IS NULL OR sm.created_at::date <= $4)
            ORDER BY sm.created_at DESC
            LIMIT $5
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.movement_type)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit.unwrap_or(100))
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Products needing attention: low stock, expiring within 7 days,
    /// out of stock
    pub async fn stock_alerts(&self) -> AppResult<StockAlerts> {
        let low_stock = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = TRUE AND stock_quantity <= min_stock_level \
             ORDER BY name",
        ))
        .fetch_all(&self.db)
        .await?;

        let expiring = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = TRUE AND expiration_date IS NOT NULL \
               AND expiration_date <= CURRENT_DATE + INTERVAL '7 days' \
             ORDER BY expiration_date",
        ))
        .fetch_all(&self.db)
        .await?;

        let out_of_stock = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = TRUE AND stock_quantity <= 0 \
             ORDER BY name",
        ))
        .fetch_all(&self.db)
        .await?;

        let counts = StockAlertCounts {
            low_stock: low_stock.len(),
            expiring: expiring.len(),
            out_of_stock: out_of_stock.len(),
        };

        Ok(StockAlerts {
            low_stock,
            expiring,
            out_of_stock,
            counts,
        })
    }

    /// Create expiration notifications for products expiring within 7 days.
    /// Returns the number of notifications created.
    pub async fn check_expirations(&self) -> AppResult<i32> {
        let expiring = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = TRUE AND expiration_date IS NOT NULL \
               AND expiration_date <= CURRENT_DATE + INTERVAL '7 days'",
        ))
        .fetch_all(&self.db)
        .await?;

        let service = self.notifications();
        let mut created = 0;
        for product in expiring {
            if let Some(notification) =
                notifications::create_expiration_notification(&self.db, &product).await?
            {
                let targets = [shared::SubscriptionKey::Role(shared::Role::GestionnaireStocks)];
                service.push_notification(
                    &targets,
                    notifications::stock_event_payload(&notification, &product),
                );
                created += 1;
            }
        }

        Ok(created)
    }
}
