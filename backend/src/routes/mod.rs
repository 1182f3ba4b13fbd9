//! Route definitions for the dairy distribution API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - order management
        .nest("/orders", order_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        // Protected routes - stock management
        .nest("/stock", stock_routes())
        // Protected routes - store sales
        .nest("/sales", sale_routes())
        // Protected routes - notifications
        .nest("/notifications", notification_routes())
}

/// Order management routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/sync", post(handlers::sync_orders))
        .route("/pending", get(handlers::pending_orders))
        .route("/unpaid", get(handlers::unpaid_orders))
        .route("/today", get(handlers::today_orders))
        .route("/stats", get(handlers::order_stats))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/status", patch(handlers::update_order_status))
        .route("/:order_id/payment", patch(handlers::update_order_payment))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product).put(handlers::update_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock management routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", post(handlers::record_stock_entry))
        .route("/exits", post(handlers::record_stock_exit))
        .route("/adjustments", post(handlers::record_stock_adjustment))
        .route("/movements", get(handlers::list_stock_movements))
        .route("/alerts", get(handlers::stock_alerts))
        .route("/alerts/check-expirations", post(handlers::check_expirations))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Store sale routes (protected)
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/today", get(handlers::today_sales))
        .route("/:sale_id", get(handlers::get_sale))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/unread-count", get(handlers::unread_count))
        .route("/mark-all-read", post(handlers::mark_all_notifications_read))
        .route(
            "/:notification_id/read",
            post(handlers::mark_notification_read),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
