//! Shared types and models for the dairy distribution management platform
//!
//! This crate contains the domain model (orders, products, stock movements,
//! sales, notifications) and the realtime wire types shared between the
//! backend services and the WebSocket layer.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
