//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use orders_types::domain::OrderId;
use orders_types::dto::OrderResponse;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// List all synchronized orders, ordered by id
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "orders",
    responses(
        (status = 200, description = "List of orders", body = Vec<OrderResponse>),
        (status = 429, description = "Rate limit exceeded"),
        (status = 503, description = "Database unavailable")
    )
)]
async fn list_orders() {}

/// HTML table of all synchronized orders
#[utoipa::path(
    get,
    path = "/",
    tag = "orders",
    responses(
        (status = 200, description = "Order table", content_type = "text/html", body = String),
        (status = 503, description = "Database unavailable")
    )
)]
async fn orders_page() {}

/// OpenAPI documentation for the order view.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Sheet Sync API",
        version = "1.0.0",
        description = "Read-only view of orders synchronized from a spreadsheet, with prices converted to roubles at the Central Bank of Russia daily rate.",
        license(name = "MIT"),
    ),
    paths(health, list_orders, orders_page),
    components(schemas(OrderResponse, OrderId)),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "orders", description = "Synchronized orders"),
    )
)]
pub struct ApiDoc;
