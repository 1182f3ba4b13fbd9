//! WebSocket endpoint for realtime notifications
//!
//! Session lifecycle: the token (query parameter) is validated before the
//! upgrade; unauthenticated attempts are refused and never join a group.
//! A connected session is subscribed to its `user:{id}` and `role:{role}`
//! groups, receives an `init` frame with its unread count, then forwards
//! pushes until the peer disconnects.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use shared::{ClientAction, PushMessage, SubscriptionKey};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{AppError, AppResult};
use crate::middleware::{authenticate_token, AuthUser};
use crate::services::NotificationService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// GET /ws/notifications?token=... upgrade to WebSocket
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = query.token.ok_or(AppError::InvalidToken)?;
    let user = authenticate_token(&token)?;

    Ok(ws.on_upgrade(move |socket| handle_session(socket, state, user)))
}

async fn handle_session(socket: WebSocket, state: AppState, user: AuthUser) {
    let mut user_rx = state.hub.subscribe(SubscriptionKey::User(user.user_id));
    let mut role_rx = state.hub.subscribe(SubscriptionKey::Role(user.role));

    tracing::info!(user_id = %user.user_id, role = user.role.as_str(), "WebSocket connected");

    let service = NotificationService::new(state.db.clone(), state.hub.clone());
    let (mut sink, mut stream) = socket.split();

    // Initial unread count
    match service.unread_count(&user).await {
        Ok(unread_count) => {
            if send_frame(&mut sink, &PushMessage::Init { unread_count })
                .await
                .is_err()
            {
                return;
            }
        }
        Err(e) => {
            tracing::error!("Failed to load unread count: {e}");
            return;
        }
    }

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = handle_client_action(&mut sink, &service, &user, &text).await {
                        tracing::warn!(user_id = %user.user_id, "Client action failed: {e}");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong handled by axum
                Some(Err(_)) => break,
            },
            pushed = user_rx.recv() => {
                if forward(&mut sink, pushed).await.is_err() {
                    break;
                }
            }
            pushed = role_rx.recv() => {
                if forward(&mut sink, pushed).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(user_id = %user.user_id, "WebSocket disconnected");
}

/// Handle one inbound client frame. Malformed JSON is ignored.
async fn handle_client_action(
    sink: &mut SplitSink<WebSocket, Message>,
    service: &NotificationService,
    user: &AuthUser,
    text: &str,
) -> AppResult<()> {
    let action: ClientAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(_) => return Ok(()),
    };

    match action {
        ClientAction::MarkRead { notification_id } => {
            service.mark_read(user, notification_id).await?;
        }
        ClientAction::MarkAllRead => {
            service.mark_all_read(user).await?;
        }
        ClientAction::GetUnreadCount => {
            let count = service.unread_count(user).await?;
            send_frame(sink, &PushMessage::UnreadCount { count })
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
    }

    Ok(())
}

/// Forward a broadcast message to the socket. A lagged receiver skips
/// missed messages (live delivery is best-effort); a closed channel or a
/// dead socket ends the session.
async fn forward(
    sink: &mut SplitSink<WebSocket, Message>,
    received: Result<PushMessage, RecvError>,
) -> Result<(), ()> {
    match received {
        Ok(message) => send_frame(sink, &message).await.map_err(|_| ()),
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "WebSocket receiver lagged, messages dropped");
            Ok(())
        }
        Err(RecvError::Closed) => Err(()),
    }
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &PushMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sink.send(Message::Text(json)).await
}
