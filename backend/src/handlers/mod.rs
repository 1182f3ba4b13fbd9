//! HTTP handlers for the dairy distribution API

pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod sales;
pub mod stock;

pub use health::*;
pub use notifications::*;
pub use orders::*;
pub use products::*;
pub use sales::*;
pub use stock::*;
