//! Persisted notifications pushed to connected clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Role;

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewOrder,
    OrderStatus,
    OrderDelivered,
    LowStock,
    Expiration,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewOrder => "new_order",
            NotificationType::OrderStatus => "order_status",
            NotificationType::OrderDelivered => "order_delivered",
            NotificationType::LowStock => "low_stock",
            NotificationType::Expiration => "expiration",
            NotificationType::System => "system",
        }
    }
}

/// Notification record.
///
/// Targets exactly one of `recipient_role` or `user_id`. Created by domain
/// events; mutated only to flip `is_read`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub recipient_role: Option<Role>,
    pub user_id: Option<Uuid>,
    pub related_order_id: Option<Uuid>,
    pub related_product_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether the notification addresses the given user
    pub fn targets(&self, user_id: Uuid, role: Role) -> bool {
        self.user_id == Some(user_id) || self.recipient_role == Some(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(role: Option<Role>, user: Option<Uuid>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            notification_type: NotificationType::LowStock,
            title: "Stock bas".to_string(),
            message: String::new(),
            recipient_role: role,
            user_id: user,
            related_order_id: None,
            related_product_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn role_targeted_notification_reaches_every_holder() {
        let n = notification(Some(Role::GestionnaireStocks), None);
        assert!(n.targets(Uuid::new_v4(), Role::GestionnaireStocks));
        assert!(!n.targets(Uuid::new_v4(), Role::Vendeur));
    }

    #[test]
    fn user_targeted_notification_reaches_only_that_user() {
        let user = Uuid::new_v4();
        let n = notification(None, Some(user));
        assert!(n.targets(user, Role::Vendeur));
        assert!(!n.targets(Uuid::new_v4(), Role::Vendeur));
    }
}
