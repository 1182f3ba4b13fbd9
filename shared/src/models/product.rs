//! Dairy product catalog with stock tracking

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Unit of measure for a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_unit", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Litre,
    Kg,
    Unite,
    Sachet,
    Pot,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Litre => "litre",
            Unit::Kg => "kg",
            Unit::Unite => "unite",
            Unit::Sachet => "sachet",
            Unit::Pot => "pot",
        }
    }

    /// Display label, e.g. for notification messages
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Litre => "Litre(s)",
            Unit::Kg => "Kilogramme(s)",
            Unit::Unite => "Unité(s)",
            Unit::Sachet => "Sachet(s)",
            Unit::Pot => "Pot(s)",
        }
    }
}

/// Dairy product
///
/// `stock_quantity` is only ever written through the stock ledger; every
/// change is paired with a `StockMovement` row in the same transaction.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub unit_price: Decimal,
    pub stock_quantity: i32,
    pub unit: Unit,
    pub barcode: Option<String>,
    pub min_stock_level: i32,
    pub expiration_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock at or below the configured minimum threshold
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity <= 0
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|d| d <= today)
    }

    /// Expires within the next 7 days
    pub fn is_expiring_soon(&self, today: NaiveDate) -> bool {
        self.expiration_date
            .is_some_and(|d| d <= today + chrono::Duration::days(7))
    }
}
