//! Business logic services for the dairy distribution platform

pub mod audit;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod sales;
pub mod stock;

pub use notifications::NotificationService;
pub use orders::OrderService;
pub use products::ProductService;
pub use sales::SaleService;
pub use stock::StockService;
