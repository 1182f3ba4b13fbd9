//! Store sales
//!
//! A walk-in sale decrements stock immediately: the sale, its items and the
//! exit movements commit as one transaction through the stock ledger.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::realtime::NotificationHub;
use crate::services::notifications::NotificationService;
use crate::services::{audit, stock};
use shared::{
    next_receipt_number, receipt_number_prefix, AuditAction, Notification, PaymentMethod,
    Product, Sale, SalePaymentStatus, Unit,
};

const SALE_COLUMNS: &str = "id, receipt_number, local_id, client_name, client_phone, \
     payment_method, payment_status, subtotal, discount, total_amount, amount_paid, amount_due, \
     notes, created_by, created_at, updated_at, synced_at";

// ============================================================================
// Inputs and views
// ============================================================================

/// Requested sale item; the unit price may override the catalog price
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

/// Input for creating a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub local_id: Option<Uuid>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<SalePaymentStatus>,
    pub discount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<SaleItemRequest>,
}

/// Sale item with product details
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SaleItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_unit: Unit,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Sale with its items
#[derive(Debug, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

/// Filters for sale listings
#[derive(Debug, Default, Deserialize)]
pub struct SaleListFilter {
    pub payment_status: Option<SalePaymentStatus>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

/// Aggregate figures for today's sales
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailySalesSummary {
    pub count: i64,
    pub total_amount: Decimal,
    pub amount_due: Decimal,
}

// ============================================================================
// Service
// ============================================================================

/// Sale service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    hub: NotificationHub,
}

impl SaleService {
    pub fn new(db: PgPool, hub: NotificationHub) -> Self {
        Self { db, hub }
    }

    /// Create a sale, decrementing stock per item in the same transaction.
    /// Receipt number collisions retry once, like order numbers.
    pub async fn create(&self, user: &AuthUser, input: CreateSaleInput) -> AppResult<SaleDetail> {
        shared::validate_has_items(&input.items).map_err(|message_fr| AppError::Validation {
            field: "items".to_string(),
            message: "The sale must contain at least one item".to_string(),
            message_fr: message_fr.to_string(),
        })?;
        let discount = input.discount.unwrap_or(Decimal::ZERO);
        shared::validate_discount(discount).map_err(|message_fr| AppError::Validation {
            field: "discount".to_string(),
            message: "Discount cannot be negative".to_string(),
            message_fr: message_fr.to_string(),
        })?;

        let mut attempt = 0;
        let (detail, alerts) = loop {
            match self.try_create(user, &input, discount).await {
                Err(err) if err.is_unique_violation() && attempt == 0 => {
                    tracing::warn!("Receipt number collision, retrying with a fresh sequence");
                    attempt += 1;
                }
                other => break other?,
            }
        };

        let notifications = NotificationService::new(self.db.clone(), self.hub.clone());
        for (notification, product) in &alerts {
            notifications.push_low_stock(notification, product);
        }

        Ok(detail)
    }

    async fn try_create(
        &self,
        user: &AuthUser,
        input: &CreateSaleInput,
        discount: Decimal,
    ) -> AppResult<(SaleDetail, Vec<(Notification, Product)>)> {
        let mut tx = self.db.begin().await?;

        // Resolve products; the requested price overrides the catalog price
        let mut lines: Vec<(Product, i32, Decimal)> = Vec::with_capacity(input.items.len());
        let mut subtotal = Decimal::ZERO;
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

            let unit_price = item.unit_price.unwrap_or(product.unit_price);
            subtotal += unit_price * Decimal::from(item.quantity);
            lines.push((product, item.quantity, unit_price));
        }

        let receipt_number = next_receipt_for_today(&mut tx).await?;
        let total_amount = subtotal - discount;
        let amount_paid = input.amount_paid.unwrap_or(Decimal::ZERO);
        let amount_due = total_amount - amount_paid;

        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales
                (receipt_number, local_id, client_name, client_phone, payment_method,
                 payment_status, subtotal, discount, total_amount, amount_paid, amount_due,
                 notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {SALE_COLUMNS}
            "#,
        ))
        .bind(&receipt_number)
        .bind(input.local_id.unwrap_or_else(Uuid::new_v4))
        .bind(&input.client_name)
        .bind(&input.client_phone)
        .bind(input.payment_method.unwrap_or(PaymentMethod::Especes))
        .bind(input.payment_status.unwrap_or(SalePaymentStatus::Payee))
        .bind(subtotal)
        .bind(discount)
        .bind(total_amount)
        .bind(amount_paid)
        .bind(amount_due)
        .bind(&input.notes)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let reason = format!("Vente {receipt_number}");
        let mut alerts = Vec::new();
        for (product, quantity, unit_price) in &lines {
            sqlx::query(
                "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, subtotal) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(sale.id)
            .bind(product.id)
            .bind(quantity)
            .bind(unit_price)
            .bind(*unit_price * Decimal::from(*quantity))
            .execute(&mut *tx)
            .await?;

            let (_movement, updated, alert) = stock::create_stock_exit(
                &mut tx,
                product.id,
                *quantity,
                user.user_id,
                Some(&reason),
                None,
            )
            .await?;
            if let Some(notification) = alert {
                alerts.push((notification, updated));
            }
        }

        audit::record(
            &mut *tx,
            Some(user.user_id),
            AuditAction::Create,
            "Sale",
            &sale.id.to_string(),
            None,
            Some(json!({
                "receipt_number": sale.receipt_number,
                "total_amount": sale.total_amount,
            })),
        )
        .await?;

        let items = fetch_item_details(&mut *tx, sale.id).await?;

        tx.commit().await?;

        Ok((SaleDetail { sale, items }, alerts))
    }

    /// Fetch one sale with its items. Vendors only see their own sales.
    pub async fn get(&self, user: &AuthUser, sale_id: Uuid) -> AppResult<SaleDetail> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1",
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        if user.is_vendor() && sale.created_by != user.user_id {
            return Err(AppError::NotFound("Sale".to_string()));
        }

        let items = fetch_item_details(&self.db, sale_id).await?;

        Ok(SaleDetail { sale, items })
    }

    /// List sales, most recent first. Vendors only see their own.
    pub async fn list(&self, user: &AuthUser, filter: SaleListFilter) -> AppResult<Vec<Sale>> {
        let scope = user.is_vendor().then_some(user.user_id);
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales
             WHERE ($1::uuid IS NULL OR created_by = $1)
               AND ($2::sale_payment_status IS NULL OR payment_status = $2)
               AND ($3::date IS NULL OR created_at::date >= $3)
               AND ($4::date IS NULL OR created_at::date <= $4)
             ORDER BY created_at DESC",
        ))
        .bind(scope)
        .bind(filter.payment_status)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(sales)
    }

    /// Aggregate figures for today
    pub async fn today_summary(&self, user: &AuthUser) -> AppResult<DailySalesSummary> {
        let scope = user.is_vendor().then_some(user.user_id);
        let summary = sqlx::query_as::<_, DailySalesSummary>(
            r#"
            SELECT COUNT(*) AS count,
                   COALESCE(SUM(total_amount), 0) AS total_amount,
                   COALESCE(SUM(amount_due), 0) AS amount_due
            FROM sales
            WHERE ($1::uuid IS NULL OR created_by = $1)
              AND created_at::date = CURRENT_DATE
            "#,
        )
        .bind(scope)
        .fetch_one(&self.db)
        .await?;

        Ok(summary)
    }
}

/// Highest existing receipt number under today's prefix, incremented
async fn next_receipt_for_today(tx: &mut Transaction<'_, Postgres>) -> AppResult<String> {
    let prefix = receipt_number_prefix(Utc::now().date_naive());
    let last: Option<String> = sqlx::query_scalar(
        "SELECT receipt_number FROM sales WHERE receipt_number LIKE $1 \
         ORDER BY receipt_number DESC LIMIT 1",
    )
    .bind(format!("{prefix}%"))
    .fetch_optional(&mut **tx)
    .await?;

    Ok(next_receipt_number(&prefix, last.as_deref()))
}

async fn fetch_item_details<'e>(
    db: impl sqlx::PgExecutor<'e>,
    sale_id: Uuid,
) -> AppResult<Vec<SaleItemDetail>> {
    let items = sqlx::query_as::<_, SaleItemDetail>(
        r#"
        SELECT si.id, si.product_id, p.name AS product_name, p.unit AS product_unit,
               si.quantity, si.unit_price, si.subtotal
        FROM sale_items si
        JOIN products p ON p.id = si.product_id
        WHERE si.sale_id = $1
        "#,
    )
    .bind(sale_id)
    .fetch_all(db)
    .await?;

    Ok(items)
}
