//! Walk-in store sales

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a sale was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Especes,
    MobileMoney,
    Carte,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Especes => "especes",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Carte => "carte",
            PaymentMethod::Credit => "credit",
        }
    }
}

/// Payment state of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SalePaymentStatus {
    Payee,
    EnAttente,
    Partielle,
}

impl SalePaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalePaymentStatus::Payee => "payee",
            SalePaymentStatus::EnAttente => "en_attente",
            SalePaymentStatus::Partielle => "partielle",
        }
    }
}

/// Store sale transaction
///
/// Unlike orders, a sale decrements stock immediately at creation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    /// `REC-YYYYMMDD-XXXX`
    pub receipt_number: String,
    pub local_id: Uuid,
    pub client_name: String,
    pub client_phone: String,
    pub payment_method: PaymentMethod,
    pub payment_status: SalePaymentStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// `subtotal - discount`
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    /// `total_amount - amount_paid`
    pub amount_due: Decimal,
    pub notes: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// Line item of a sale
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Receipt prefix for a calendar day: `REC-YYYYMMDD`
pub fn receipt_number_prefix(date: NaiveDate) -> String {
    format!("REC-{}", date.format("%Y%m%d"))
}

/// Next receipt number under `prefix`, with the same malformed-suffix
/// recovery as order numbers.
pub fn next_receipt_number(prefix: &str, last_existing: Option<&str>) -> String {
    let next = last_existing
        .and_then(|n| n.strip_prefix(prefix))
        .and_then(|suffix| suffix.strip_prefix('-'))
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{prefix}-{next:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_receipt_of_the_day() {
        assert_eq!(next_receipt_number("REC-20250601", None), "REC-20250601-0001");
    }

    #[test]
    fn receipt_sequence_increments() {
        assert_eq!(
            next_receipt_number("REC-20250601", Some("REC-20250601-0107")),
            "REC-20250601-0108"
        );
    }

    #[test]
    fn malformed_receipt_suffix_restarts() {
        assert_eq!(
            next_receipt_number("REC-20250601", Some("REC-20250601-00xy")),
            "REC-20250601-0001"
        );
    }
}
