//! Realtime wire types shared between the dispatcher and the session registry

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// Addressable subscriber group for realtime pushes.
///
/// Every connected session joins its own `User` key and the `Role` key of
/// its role; the dispatcher publishes to whichever groups an event targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    User(Uuid),
    Role(Role),
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionKey::User(id) => write!(f, "user:{id}"),
            SubscriptionKey::Role(role) => write!(f, "role:{}", role.as_str()),
        }
    }
}

/// Server-to-client frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Sent once on connect
    Init { unread_count: i64 },
    /// Reply to a `get_unread_count` action
    UnreadCount { count: i64 },
    Notification { data: serde_json::Value },
    OrderUpdate { data: serde_json::Value },
    StockAlert { data: serde_json::Value },
}

/// Client-to-server frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    MarkRead { notification_id: Uuid },
    MarkAllRead,
    GetUnreadCount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_message_wire_shape() {
        let msg = PushMessage::UnreadCount { count: 3 };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"type": "unread_count", "count": 3})
        );

        let msg = PushMessage::Notification {
            data: serde_json::json!({"title": "Nouvelle commande"}),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({
                "type": "notification",
                "data": {"title": "Nouvelle commande"},
            })
        );
    }

    #[test]
    fn client_action_parses_from_wire_json() {
        let id = Uuid::new_v4();
        let parsed: ClientAction = serde_json::from_str(&format!(
            r#"{{"action": "mark_read", "notification_id": "{id}"}}"#
        ))
        .unwrap();
        assert_eq!(parsed, ClientAction::MarkRead { notification_id: id });

        let parsed: ClientAction =
            serde_json::from_str(r#"{"action": "get_unread_count"}"#).unwrap();
        assert_eq!(parsed, ClientAction::GetUnreadCount);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ClientAction>(r#"{"action": "subscribe"}"#).is_err());
    }

    #[test]
    fn subscription_keys_compare_by_target() {
        let user = Uuid::new_v4();
        assert_eq!(SubscriptionKey::User(user), SubscriptionKey::User(user));
        assert_ne!(
            SubscriptionKey::Role(Role::Admin),
            SubscriptionKey::Role(Role::Vendeur)
        );
        assert_ne!(
            SubscriptionKey::User(user),
            SubscriptionKey::Role(Role::Admin)
        );
    }
}
