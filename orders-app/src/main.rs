//! # Orders Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Build the Sheets and CBR clients
//! - Run the sync loop, the read-only web view, or both

mod config;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_rates::{CbrClient, RateCache};
use orders_hex::inbound::{HttpServer, RateLimiterState, shutdown_signal};
use orders_hex::{OrderService, Poller, PollerConfig};
use orders_repo::{Repo, build_repo};
use orders_types::OrderRepository;
use sheets_client::SheetsClient;

use config::{Config, DatabaseTarget};

#[derive(Parser)]
#[command(name = "orders")]
#[command(author, version, about = "Order sheet sync service", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the sheet and reconcile orders into the database
    Sync {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Serve the read-only order view
    Serve,
    /// Sync and serve in one process (default)
    Run,
}

struct Telemetry {
    tracer: sdktrace::SdkTracerProvider,
    meter: SdkMeterProvider,
}

impl Telemetry {
    fn shutdown(self) {
        let _ = self.tracer.shutdown();
        let _ = self.meter.shutdown();
    }
}

fn init_telemetry() -> anyhow::Result<(sdktrace::Tracer, Telemetry)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;
    let tracer = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .build();
    global::set_tracer_provider(tracer.clone());

    // Feeds the HTTP metrics layer of the web view
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;
    let meter = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();
    global::set_meter_provider(meter.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((tracer.tracer("orders-service"), Telemetry { tracer, meter }))
}

/// Sets up logging; OTLP export is enabled by `OTEL_EXPORTER_OTLP_ENDPOINT`.
fn init_tracing(json: bool) -> anyhow::Result<Option<Telemetry>> {
    let (otel_tracer, telemetry) = if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        let (tracer, telemetry) = init_telemetry()?;
        (Some(tracer), Some(telemetry))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,orders_app=debug,orders_hex=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(otel_tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t)))
        .init();

    Ok(telemetry)
}

async fn open_repo(target: &DatabaseTarget) -> anyhow::Result<Repo> {
    match target {
        DatabaseTarget::Url(url) => build_repo(url).await,
        DatabaseTarget::Parts(settings) => repo_from_settings(settings),
    }
}

#[cfg(feature = "postgres")]
fn repo_from_settings(settings: &orders_repo::DatabaseSettings) -> anyhow::Result<Repo> {
    Ok(Repo::from_settings(settings))
}

#[cfg(not(feature = "postgres"))]
fn repo_from_settings(_settings: &orders_repo::DatabaseSettings) -> anyhow::Result<Repo> {
    anyhow::bail!("DB_* settings need the postgres feature; set DATABASE_URL instead")
}

fn build_poller(
    config: &Config,
    repo: Arc<Repo>,
) -> anyhow::Result<Poller<SheetsClient, Arc<Repo>, CbrClient>> {
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let sheets = SheetsClient::new(
        config.sheets_api_url.clone(),
        config.spreadsheet_id.clone(),
        config.token.clone(),
    )
    .with_range(config.sheet_range.clone())
    .with_http_client(http.clone());

    let rates = RateCache::new(
        CbrClient::with_client(config.cbr_base_url.clone(), http),
        config.rate_window,
    );

    Ok(Poller::new(
        sheets,
        repo,
        rates,
        PollerConfig {
            interval: config.poll_interval,
            retry: config.retry,
            strategy: config.strategy,
            rate_id: config.rate_id.clone(),
            ..PollerConfig::default()
        },
    ))
}

fn build_server(config: &Config, repo: Arc<Repo>) -> HttpServer<Arc<Repo>> {
    let limiter = RateLimiterState::new(config.view_rate_limit, Duration::from_secs(60))
        .trust_forwarded_for(config.trust_forwarded_for);
    HttpServer::with_rate_limiter(OrderService::new(repo), limiter)
}

/// Resolves once the shared shutdown signal fires.
fn until_shutdown(mut rx: watch::Receiver<bool>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let telemetry = init_tracing(cli.json_logs)?;

    let config = Config::from_env()?;
    tracing::info!("Using database: {}", config.database);

    let repo = Arc::new(open_repo(&config.database).await?);

    // The sync loop keeps retrying, so an unreachable database is not fatal here
    if let Err(e) = repo.ensure_schema().await {
        tracing::warn!("Could not create orders schema yet: {}", e);
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let result: anyhow::Result<()> = match cli.command.unwrap_or(Commands::Run) {
        Commands::Sync { once: true } => {
            let poller = build_poller(&config, repo)?;
            poller
                .run_once()
                .await
                .map(|summary| tracing::info!("Sync finished: {}", summary))
                .map_err(anyhow::Error::from)
        }
        Commands::Sync { once: false } => {
            let poller = build_poller(&config, repo)?;
            poller
                .run(until_shutdown(stop_rx))
                .await
                .map_err(anyhow::Error::from)
        }
        Commands::Serve => {
            tracing::info!("Starting order view on port {}", config.port);
            build_server(&config, repo)
                .run_until(&addr, until_shutdown(stop_rx))
                .await
        }
        Commands::Run => {
            tracing::info!("Starting order sync and view on port {}", config.port);
            let poller = build_poller(&config, repo.clone())?;
            let server = build_server(&config, repo);

            // A fatal sync error ends the whole process
            tokio::select! {
                result = poller.run(until_shutdown(stop_rx.clone())) => {
                    result.map_err(anyhow::Error::from)
                }
                result = server.run_until(&addr, until_shutdown(stop_rx)) => result,
            }
        }
    };

    // Ensure traces and metrics are flushed before exit
    if let Some(telemetry) = telemetry {
        telemetry.shutdown();
    }
    result
}
