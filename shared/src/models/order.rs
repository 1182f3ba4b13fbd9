//! Order aggregate: customer orders and their line items
//!
//! Workflow:
//! 1. A vendor creates the order (status `nouvelle`)
//! 2. An order manager advances the delivery status through the workflow
//! 3. Reaching `livree` decrements stock for every line item, exactly once

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Position of an order in the fulfillment workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Nouvelle,
    EnPreparation,
    EnCours,
    Livree,
    Annulee,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Nouvelle => "nouvelle",
            DeliveryStatus::EnPreparation => "en_preparation",
            DeliveryStatus::EnCours => "en_cours",
            DeliveryStatus::Livree => "livree",
            DeliveryStatus::Annulee => "annulee",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Nouvelle => "Nouvelle",
            DeliveryStatus::EnPreparation => "En préparation",
            DeliveryStatus::EnCours => "En cours de livraison",
            DeliveryStatus::Livree => "Livrée",
            DeliveryStatus::Annulee => "Annulée",
        }
    }

    /// `livree` and `annulee` end the workflow
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Livree | DeliveryStatus::Annulee)
    }

    fn rank(&self) -> u8 {
        match self {
            DeliveryStatus::Nouvelle => 0,
            DeliveryStatus::EnPreparation => 1,
            DeliveryStatus::EnCours => 2,
            DeliveryStatus::Livree => 3,
            // annulee sits outside the forward chain
            DeliveryStatus::Annulee => u8::MAX,
        }
    }

    /// Whether the workflow permits moving from `self` to `target`.
    ///
    /// Forward moves along `nouvelle → en_preparation → en_cours → livree`
    /// are allowed (including skips and same-status no-ops); cancellation is
    /// allowed from any non-terminal state; nothing leaves `annulee`.
    pub fn can_transition_to(&self, target: DeliveryStatus) -> bool {
        if *self == DeliveryStatus::Annulee {
            return false;
        }
        match target {
            DeliveryStatus::Annulee => !self.is_terminal(),
            _ => target.rank() >= self.rank(),
        }
    }
}

/// Payment state, orthogonal to the delivery workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    NonPayee,
    Payee,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NonPayee => "non_payee",
            PaymentStatus::Payee => "payee",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::NonPayee => "Non payée",
            PaymentStatus::Payee => "Payée",
        }
    }
}

/// Delivery priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Basse,
    Moyenne,
    Haute,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Basse => "basse",
            Priority::Moyenne => "moyenne",
            Priority::Haute => "haute",
        }
    }
}

/// Customer order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    /// Human-readable number: date prefix + 4-digit daily sequence
    pub order_number: String,
    /// Opaque identifier assigned by the mobile client for offline sync
    pub local_id: Uuid,
    pub client_name: String,
    pub client_phone: String,
    pub delivery_address: String,
    pub delivery_date: NaiveDate,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub priority: Priority,
    /// Always equals the sum of line item subtotals (FCFA)
    pub total_price: Decimal,
    pub notes: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_delivered(&self) -> bool {
        self.delivery_status == DeliveryStatus::Livree
    }

    pub fn is_cancelled(&self) -> bool {
        self.delivery_status == DeliveryStatus::Annulee
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Payee
    }
}

/// Line item of an order
///
/// `unit_price` is snapshotted from the product at creation time and is
/// immune to later catalog price changes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Date prefix for order numbers: `YYYYMMDD`
pub fn order_number_prefix(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Compute the next order number under `prefix` given the highest existing
/// number for that day.
///
/// A malformed or non-numeric suffix restarts the daily sequence at 1
/// instead of failing.
pub fn next_order_number(prefix: &str, last_existing: Option<&str>) -> String {
    let next = last_existing
        .and_then(|n| n.strip_prefix(prefix))
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{prefix}{next:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        use DeliveryStatus::*;
        assert!(Nouvelle.can_transition_to(EnPreparation));
        assert!(EnPreparation.can_transition_to(EnCours));
        assert!(EnCours.can_transition_to(Livree));
        // skipping intermediate steps is permitted
        assert!(Nouvelle.can_transition_to(Livree));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        use DeliveryStatus::*;
        assert!(!EnCours.can_transition_to(Nouvelle));
        assert!(!Livree.can_transition_to(EnCours));
        assert!(!Livree.can_transition_to(Nouvelle));
    }

    #[test]
    fn cancellation_only_from_non_terminal_states() {
        use DeliveryStatus::*;
        assert!(Nouvelle.can_transition_to(Annulee));
        assert!(EnPreparation.can_transition_to(Annulee));
        assert!(EnCours.can_transition_to(Annulee));
        assert!(!Livree.can_transition_to(Annulee));
    }

    #[test]
    fn nothing_leaves_a_cancelled_order() {
        use DeliveryStatus::*;
        for target in [Nouvelle, EnPreparation, EnCours, Livree, Annulee] {
            assert!(!Annulee.can_transition_to(target));
        }
    }

    #[test]
    fn same_status_is_a_permitted_no_op() {
        use DeliveryStatus::*;
        assert!(Livree.can_transition_to(Livree));
        assert!(EnCours.can_transition_to(EnCours));
    }

    #[test]
    fn first_order_of_the_day() {
        assert_eq!(next_order_number("20250601", None), "202506010001");
    }

    #[test]
    fn sequence_increments_from_last_number() {
        assert_eq!(
            next_order_number("20250601", Some("202506010041")),
            "202506010042"
        );
    }

    #[test]
    fn malformed_suffix_restarts_the_sequence() {
        assert_eq!(
            next_order_number("20250601", Some("20250601ABCD")),
            "202506010001"
        );
        // number from another prefix is treated as absent
        assert_eq!(
            next_order_number("20250601", Some("202505310007")),
            "202506010001"
        );
    }

    #[test]
    fn prefix_formats_the_calendar_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(order_number_prefix(date), "20250601");
    }
}
