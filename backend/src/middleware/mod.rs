//! Request middleware

pub mod auth;

pub use auth::{
    auth_middleware, authenticate_token, require_order_manager, require_stock_manager,
    AuthUser, CurrentUser,
};
