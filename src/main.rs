use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use request_logger::config::{AppConfig, DatabaseConfig};
use request_logger::{create_app, AppState, DbRuntimeLayer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config.database)?;
    info!("Configuration loaded successfully");

    init_metrics(&config)?;

    let state = AppState::new(config.clone());

    if let Some(key) = config.request_logging.instrumentation_key.clone() {
        let mut rx = state.notifications.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => info!(
                        name = %notification.name,
                        payload = %notification.payload,
                        "Instrumented request"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(key = %key, skipped, "Notification consumer lagged")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let app = create_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Request logger demo starting on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(database: &DatabaseConfig) -> Result<()> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Unfiltered, so query events below the display level still count.
    let db_layer = database
        .enabled
        .then(|| DbRuntimeLayer::new(&database.event_target, &database.elapsed_field));

    let subscriber = tracing_subscriber::registry().with(db_layer);

    match log_format.as_str() {
        "json" => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json().with_filter(env_filter()))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(tracing_subscriber::fmt::layer().with_filter(env_filter()))
                .try_init()?;
        }
    }

    Ok(())
}

fn init_metrics(config: &AppConfig) -> Result<()> {
    if config.metrics.enabled {
        let builder = PrometheusBuilder::new();
        builder
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()?;

        info!("Metrics exporter initialized on port {}", config.metrics.port);
    }

    Ok(())
}
