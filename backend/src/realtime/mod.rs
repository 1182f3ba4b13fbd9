//! Realtime session registry
//!
//! Tracks live WebSocket sessions grouped by typed subscription keys
//! (specific user or role) and fans dispatcher messages out to every
//! session joined to the addressed group.

mod hub;
mod ws;

pub use hub::NotificationHub;
pub use ws::ws_handler;
