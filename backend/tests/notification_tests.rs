//! Notification dispatch tests
//!
//! Covers:
//! - Role/user targeting and unread-count scoping
//! - Duplicate suppression of unread low-stock alerts
//! - Read-state round trip: create → mark read → excluded from unread
//! - Realtime frame shapes on the wire

use proptest::prelude::*;
use shared::{Notification, NotificationType, PushMessage, Role};
use uuid::Uuid;

/// In-memory stand-in for the notifications table
#[derive(Default)]
struct NotificationStore {
    rows: Vec<Notification>,
}

impl NotificationStore {
    fn create_role(&mut self, notification_type: NotificationType, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.rows.push(Notification {
            id,
            notification_type,
            title: String::new(),
            message: String::new(),
            recipient_role: Some(role),
            user_id: None,
            related_order_id: None,
            related_product_id: None,
            is_read: false,
            created_at: chrono::Utc::now(),
        });
        id
    }

    /// Mirrors the conditional insert: no row while an unread low-stock
    /// alert exists for the product
    fn create_low_stock(&mut self, product_id: Uuid) -> Option<Uuid> {
        let unread_exists = self.rows.iter().any(|n| {
            n.notification_type == NotificationType::LowStock
                && n.related_product_id == Some(product_id)
                && !n.is_read
        });
        if unread_exists {
            return None;
        }

        let id = Uuid::new_v4();
        self.rows.push(Notification {
            id,
            notification_type: NotificationType::LowStock,
            title: String::new(),
            message: String::new(),
            recipient_role: Some(Role::GestionnaireStocks),
            user_id: None,
            related_order_id: None,
            related_product_id: Some(product_id),
            is_read: false,
            created_at: chrono::Utc::now(),
        });
        Some(id)
    }

    fn mark_read(&mut self, id: Uuid) -> bool {
        match self.rows.iter_mut().find(|n| n.id == id && !n.is_read) {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        }
    }

    fn unread_count(&self, user_id: Uuid, role: Role) -> usize {
        self.rows
            .iter()
            .filter(|n| !n.is_read && n.targets(user_id, role))
            .count()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_unread_count_scopes_by_user_and_role() {
        let mut store = NotificationStore::default();
        let manager = Uuid::new_v4();

        store.create_role(NotificationType::NewOrder, Role::GestionnaireCommandes);
        store.create_role(NotificationType::LowStock, Role::GestionnaireStocks);

        assert_eq!(store.unread_count(manager, Role::GestionnaireCommandes), 1);
        assert_eq!(store.unread_count(manager, Role::GestionnaireStocks), 1);
        assert_eq!(store.unread_count(manager, Role::Vendeur), 0);
    }

    /// Scenario: a second exit before the first alert is read creates no
    /// additional low-stock notification
    #[test]
    fn test_unread_low_stock_alert_suppresses_duplicates() {
        let mut store = NotificationStore::default();
        let product = Uuid::new_v4();

        let first = store.create_low_stock(product);
        assert!(first.is_some());

        let second = store.create_low_stock(product);
        assert!(second.is_none());
        assert_eq!(store.rows.len(), 1);
    }

    /// Once the alert is read, the next low-stock event alerts again
    #[test]
    fn test_read_alert_no_longer_suppresses() {
        let mut store = NotificationStore::default();
        let product = Uuid::new_v4();

        let first = store.create_low_stock(product).unwrap();
        store.mark_read(first);

        assert!(store.create_low_stock(product).is_some());
        assert_eq!(store.rows.len(), 2);
    }

    #[test]
    fn test_suppression_is_per_product() {
        let mut store = NotificationStore::default();
        let milk = Uuid::new_v4();
        let yogurt = Uuid::new_v4();

        assert!(store.create_low_stock(milk).is_some());
        assert!(store.create_low_stock(yogurt).is_some());
        assert!(store.create_low_stock(milk).is_none());
    }

    /// Round trip: create → mark read → excluded from the unread count
    #[test]
    fn test_mark_read_round_trip() {
        let mut store = NotificationStore::default();
        let manager = Uuid::new_v4();

        let id = store.create_role(NotificationType::NewOrder, Role::GestionnaireCommandes);
        assert_eq!(store.unread_count(manager, Role::GestionnaireCommandes), 1);

        assert!(store.mark_read(id));
        assert_eq!(store.unread_count(manager, Role::GestionnaireCommandes), 0);
    }

    /// Marking twice is an idempotent no-op
    #[test]
    fn test_mark_read_is_idempotent() {
        let mut store = NotificationStore::default();
        let id = store.create_role(NotificationType::NewOrder, Role::GestionnaireCommandes);

        assert!(store.mark_read(id));
        assert!(!store.mark_read(id));
        assert!(!store.mark_read(Uuid::new_v4()));
    }

    #[test]
    fn test_init_frame_shape() {
        let frame = PushMessage::Init { unread_count: 4 };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"type": "init", "unread_count": 4})
        );
    }

    #[test]
    fn test_push_frame_shapes() {
        let data = serde_json::json!({"order_number": "202506010001"});

        let frame = PushMessage::OrderUpdate { data: data.clone() };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"type": "order_update", "data": data})
        );

        let frame = PushMessage::StockAlert { data: data.clone() };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"type": "stock_alert", "data": data})
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// However many consecutive low-stock events fire, exactly one
        /// unread alert exists per product
        #[test]
        fn prop_one_unread_alert_per_product(events in 1usize..20) {
            let mut store = NotificationStore::default();
            let product = Uuid::new_v4();

            let created = (0..events)
                .filter_map(|_| store.create_low_stock(product))
                .count();

            prop_assert_eq!(created, 1);
        }

        /// Reading the alert re-arms it: one alert per read cycle, and
        /// duplicates are suppressed while it stays unread
        #[test]
        fn prop_alert_rearms_after_each_read(cycles in 1usize..10) {
            let mut store = NotificationStore::default();
            let product = Uuid::new_v4();

            let mut created = 0;
            for _ in 0..cycles {
                let id = store.create_low_stock(product);
                prop_assert!(id.is_some());
                created += 1;

                prop_assert!(store.create_low_stock(product).is_none());
                store.mark_read(id.unwrap());
            }

            prop_assert_eq!(created, cycles);
        }

        /// Marking every notification read always empties the unread count
        #[test]
        fn prop_mark_all_empties_unread(count in 1usize..30) {
            let mut store = NotificationStore::default();
            let manager = Uuid::new_v4();

            for _ in 0..count {
                store.create_role(NotificationType::NewOrder, Role::GestionnaireCommandes);
            }
            prop_assert_eq!(store.unread_count(manager, Role::GestionnaireCommandes), count);

            let ids: Vec<Uuid> = store.rows.iter().map(|n| n.id).collect();
            for id in ids {
                store.mark_read(id);
            }

            prop_assert_eq!(store.unread_count(manager, Role::GestionnaireCommandes), 0);
        }
    }
}
