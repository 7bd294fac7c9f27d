//! HTTP request handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use utoipa::OpenApi;

use orders_types::{AppError, OrderRecord, OrderRepository, OrderResponse};

use crate::OrderService;
use crate::openapi::ApiDoc;

/// Application state shared across handlers.
pub struct AppState<R: OrderRepository> {
    pub service: OrderService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        tracing::error!(status = status.as_u16(), "Request failed: {}", message);

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// List all orders as JSON.
#[tracing::instrument(skip(state))]
pub async fn list_orders<R: OrderRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.service.list_orders().await?;
    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(body))
}

/// HTML table of all orders.
#[tracing::instrument(skip(state))]
pub async fn orders_page<R: OrderRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.service.list_orders().await?;
    Ok(Html(render_orders(&orders)))
}

/// OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

fn render_orders(orders: &[OrderRecord]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Orders</title>\n</head>\n<body>\n<h1>Orders</h1>\n",
    );

    if orders.is_empty() {
        html.push_str("<p>No orders yet.</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>id</th><th>Order №</th><th>Price, $</th><th>Delivery date</th><th>Price, ₽</th></tr>\n",
        );
        for order in orders {
            // Writing into a String cannot fail
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                order.id,
                order.order_number,
                order.price_usd,
                order.delivery_date.format("%d.%m.%Y"),
                order.price_rub,
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
