//! Stock ledger tests
//!
//! Covers:
//! - The before/after invariant of every movement
//! - Chain continuity: each movement starts where the previous one ended
//! - Exit negation, adjustments in both directions, the no-floor policy
//! - Low-stock threshold boundary

use proptest::prelude::*;
use shared::{is_consistent_chain, MovementType, StockMovement};
use uuid::Uuid;

/// Simulate one ledger operation against a running stock level
fn simulate(
    chain: &mut Vec<StockMovement>,
    stock: &mut i32,
    movement_type: MovementType,
    amount: i32,
) {
    let quantity = match movement_type {
        MovementType::Entree => amount,
        MovementType::Sortie => -amount,
        // adjustments carry the delta to the target level
        MovementType::Ajustement => amount - *stock,
    };
    let previous = *stock;
    *stock += quantity;

    chain.push(StockMovement {
        id: Uuid::new_v4(),
        product_id: Uuid::nil(),
        movement_type,
        quantity,
        previous_quantity: previous,
        new_quantity: *stock,
        order_id: None,
        reason: String::new(),
        user_id: Uuid::nil(),
        created_at: chrono::Utc::now(),
    });
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_entry_increases_stock() {
        let mut chain = Vec::new();
        let mut stock = 5;
        simulate(&mut chain, &mut stock, MovementType::Entree, 10);

        assert_eq!(stock, 15);
        assert_eq!(chain[0].quantity, 10);
        assert!(chain[0].is_balanced());
    }

    /// Exit movements store the negated quantity
    #[test]
    fn test_exit_stores_negative_quantity() {
        let mut chain = Vec::new();
        let mut stock = 10;
        simulate(&mut chain, &mut stock, MovementType::Sortie, 4);

        assert_eq!(stock, 6);
        assert_eq!(chain[0].quantity, -4);
        assert_eq!(chain[0].previous_quantity, 10);
        assert_eq!(chain[0].new_quantity, 6);
    }

    /// The ledger enforces no floor: stock may go negative
    #[test]
    fn test_exit_may_drive_stock_negative() {
        let mut chain = Vec::new();
        let mut stock = 3;
        simulate(&mut chain, &mut stock, MovementType::Sortie, 5);

        assert_eq!(stock, -2);
        assert!(chain[0].is_balanced());
    }

    #[test]
    fn test_adjustment_delta_both_directions() {
        let mut chain = Vec::new();
        let mut stock = 20;

        simulate(&mut chain, &mut stock, MovementType::Ajustement, 35);
        assert_eq!(chain[0].quantity, 15);

        simulate(&mut chain, &mut stock, MovementType::Ajustement, 10);
        assert_eq!(chain[1].quantity, -25);

        simulate(&mut chain, &mut stock, MovementType::Ajustement, 10);
        assert_eq!(chain[2].quantity, 0);

        assert!(is_consistent_chain(&chain));
    }

    /// Stock after any sequence equals the last movement's new_quantity
    #[test]
    fn test_stock_tracks_last_movement() {
        let mut chain = Vec::new();
        let mut stock = 0;

        simulate(&mut chain, &mut stock, MovementType::Entree, 50);
        simulate(&mut chain, &mut stock, MovementType::Sortie, 12);
        simulate(&mut chain, &mut stock, MovementType::Ajustement, 30);
        simulate(&mut chain, &mut stock, MovementType::Sortie, 7);

        assert_eq!(stock, chain.last().unwrap().new_quantity);
        assert_eq!(stock, 23);
        assert!(is_consistent_chain(&chain));
    }

    /// Delivering an order with several line items produces one exit per item
    #[test]
    fn test_order_delivery_one_exit_per_item() {
        let items = [(3, 10), (1, 25)]; // (quantity, starting stock)
        let mut movements = Vec::new();

        for (quantity, starting_stock) in items {
            let mut chain = Vec::new();
            let mut stock = starting_stock;
            simulate(&mut chain, &mut stock, MovementType::Sortie, quantity);
            movements.extend(chain);
        }

        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].new_quantity, 7);
        assert_eq!(movements[1].new_quantity, 24);
    }

    /// The low-stock boundary is inclusive: stock == threshold alerts
    #[test]
    fn test_low_stock_threshold_boundary() {
        let threshold = 10;

        assert!(9 <= threshold);
        assert!(10 <= threshold);
        assert!(!(11 <= threshold));
    }

    /// Scenario: stock 10, threshold 10, exit of 1 → level 9 triggers
    #[test]
    fn test_exit_to_nine_under_threshold_ten() {
        let mut chain = Vec::new();
        let mut stock = 10;
        simulate(&mut chain, &mut stock, MovementType::Sortie, 1);

        let min_stock_level = 10;
        assert!(stock <= min_stock_level);
    }

    #[test]
    fn test_broken_chain_detected() {
        let mut chain = Vec::new();
        let mut stock = 0;
        simulate(&mut chain, &mut stock, MovementType::Entree, 10);
        simulate(&mut chain, &mut stock, MovementType::Sortie, 3);

        // tamper with a snapshot
        chain[1].previous_quantity = 42;
        assert!(!is_consistent_chain(&chain));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn operation_strategy() -> impl Strategy<Value = (MovementType, i32)> {
        prop_oneof![
            (Just(MovementType::Entree), 1i32..=1000),
            (Just(MovementType::Sortie), 1i32..=1000),
            (Just(MovementType::Ajustement), 0i32..=1000),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every movement satisfies new = previous + quantity, and the
        /// chain of snapshots is continuous
        #[test]
        fn prop_chain_is_always_consistent(
            start in 0i32..=1000,
            operations in prop::collection::vec(operation_strategy(), 1..30)
        ) {
            let mut chain = Vec::new();
            let mut stock = start;

            for (movement_type, amount) in operations {
                simulate(&mut chain, &mut stock, movement_type, amount);
            }

            prop_assert!(is_consistent_chain(&chain));
            prop_assert_eq!(stock, chain.last().unwrap().new_quantity);
            prop_assert_eq!(chain[0].previous_quantity, start);
        }

        /// The final stock level is the start plus the sum of signed deltas
        #[test]
        fn prop_stock_equals_start_plus_deltas(
            start in 0i32..=1000,
            operations in prop::collection::vec(operation_strategy(), 1..30)
        ) {
            let mut chain = Vec::new();
            let mut stock = start;

            for (movement_type, amount) in operations {
                simulate(&mut chain, &mut stock, movement_type, amount);
            }

            let delta_sum: i64 = chain.iter().map(|m| m.quantity as i64).sum();
            prop_assert_eq!(stock as i64, start as i64 + delta_sum);
        }

        /// An adjustment always lands exactly on its target
        #[test]
        fn prop_adjustment_reaches_target(
            start in 0i32..=1000,
            target in 0i32..=1000
        ) {
            let mut chain = Vec::new();
            let mut stock = start;
            simulate(&mut chain, &mut stock, MovementType::Ajustement, target);

            prop_assert_eq!(stock, target);
            prop_assert_eq!(chain[0].quantity, target - start);
        }

        /// Exits alert iff the resulting level is at or below the threshold
        #[test]
        fn prop_low_stock_alert_condition(
            start in 0i32..=100,
            quantity in 1i32..=100,
            threshold in 0i32..=50
        ) {
            let mut chain = Vec::new();
            let mut stock = start;
            simulate(&mut chain, &mut stock, MovementType::Sortie, quantity);

            let alerts = stock <= threshold;
            prop_assert_eq!(alerts, start - quantity <= threshold);
        }
    }
}
