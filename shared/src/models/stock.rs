//! Append-only stock movement ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of stock movement
///
/// - `entree`: stock entry (supplier delivery, return)
/// - `sortie`: stock exit (order delivery, direct sale)
/// - `ajustement`: inventory correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Entree,
    Sortie,
    Ajustement,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entree => "entree",
            MovementType::Sortie => "sortie",
            MovementType::Ajustement => "ajustement",
        }
    }
}

/// One stock change record.
///
/// Immutable once written. `quantity` is signed: positive for entries,
/// negative for exits. For every movement
/// `new_quantity = previous_quantity + quantity`, and consecutive movements
/// of a product chain: the `previous_quantity` of movement N+1 equals the
/// `new_quantity` of movement N.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    /// Set for automatic decrements on order delivery
    pub order_id: Option<Uuid>,
    pub reason: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// The before/after invariant every movement must satisfy
    pub fn is_balanced(&self) -> bool {
        self.previous_quantity + self.quantity == self.new_quantity
    }
}

/// Verify the append-only audit chain over movements of a single product,
/// ordered chronologically.
pub fn is_consistent_chain(movements: &[StockMovement]) -> bool {
    movements.iter().all(StockMovement::is_balanced)
        && movements
            .windows(2)
            .all(|w| w[0].new_quantity == w[1].previous_quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(kind: MovementType, qty: i32, prev: i32) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            movement_type: kind,
            quantity: qty,
            previous_quantity: prev,
            new_quantity: prev + qty,
            order_id: None,
            reason: String::new(),
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn balanced_movement_checks_out() {
        assert!(movement(MovementType::Entree, 10, 5).is_balanced());
        assert!(movement(MovementType::Sortie, -4, 20).is_balanced());
    }

    #[test]
    fn chain_continuity_requires_matching_snapshots() {
        let a = movement(MovementType::Entree, 10, 0);
        let b = movement(MovementType::Sortie, -3, 10);
        let c = movement(MovementType::Ajustement, -2, 7);
        assert!(is_consistent_chain(&[a.clone(), b.clone(), c]));

        let gap = movement(MovementType::Sortie, -1, 99);
        assert!(!is_consistent_chain(&[a, b, gap]));
    }

    #[test]
    fn empty_chain_is_trivially_consistent() {
        assert!(is_consistent_chain(&[]));
    }
}
