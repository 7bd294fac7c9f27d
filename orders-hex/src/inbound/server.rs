//! HTTP Server configuration and startup.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use orders_types::OrderRepository;

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::OrderService;

/// HTTP server for the order view.
pub struct HttpServer<R: OrderRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: OrderRepository> HttpServer<R> {
    /// Creates a new HTTP server with the default limit of 100 requests/min.
    pub fn new(service: OrderService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()),
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: OrderService<R>, requests_per_minute: u32) -> Self {
        Self::with_rate_limiter(
            service,
            RateLimiterState::new(requests_per_minute, Duration::from_secs(60)),
        )
    }

    /// Creates a new HTTP server with a preconfigured limiter.
    pub fn with_rate_limiter(service: OrderService<R>, rate_limiter: RateLimiterState) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Uses the globally set MeterProvider
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/", get(handlers::orders_page::<R>))
            .route("/api/orders", get(handlers::list_orders::<R>))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .route("/health", get(handlers::health))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server until `shutdown` resolves, then drains connections.
    pub async fn run_until<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        // Peer addresses key the rate limiter
        axum::serve(
            listener,
            self.router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        Ok(())
    }
}

/// Resolves on ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
