use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herb_auth_server::{
    config::settings::{Config, LoggingConfig},
    error::Result,
    server::startup::start_server,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let logging = LoggingConfig::load();
    init_tracing(&logging);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!("Starting herb-auth-server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: bind={}:{}, workers={}, database={}, auth={:?}",
        config.server.host,
        config.server.port,
        config.server.worker_threads,
        config
            .database
            .redacted_url()
            .unwrap_or_else(|| "in-memory".to_string()),
        config.auth
    );

    if let Err(e) = start_server(config).await {
        error!("Server failed: {}", e);
        return Err(e);
    }

    info!("Server shutdown completed successfully");
    Ok(())
}

/// Structured logging: `RUST_LOG` overrides the configured filter,
/// `LOG_FORMAT=json` switches to JSON lines
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.filter));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .init();
    }

    info!("Structured logging initialized with filter: {}", logging.filter);
}
