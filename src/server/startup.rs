use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{middleware, web, App, HttpServer};
use tokio::signal;
use tracing::{error, info};

use crate::config::constants::{
    DEFAULT_CORS_MAX_AGE_SECS, HTTP_CLIENT_REQUEST_TIMEOUT_SECS, HTTP_KEEPALIVE_SECS,
    HTTP_SHUTDOWN_TIMEOUT_SECS,
};
use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::handlers;
use crate::server::app_state::AppState;
use crate::server::session_cleanup::SessionCleanupScheduler;

/// Build stores from configuration and serve until a shutdown signal
pub async fn start_server(config: Config) -> Result<()> {
    config.validate()?;
    let state = AppState::from_config(config).await?;
    run(state).await
}

/// Serve HTTP on an already-built state
pub async fn run(state: AppState) -> Result<()> {
    let server_config = state.config.server.clone();
    let addr = server_config.address()?;

    let cleanup = SessionCleanupScheduler::new(
        state.auth.clone(),
        state.config.auth.session_cleanup_interval_secs,
    )
    .start();

    let data = web::Data::new(state);
    let app_data = data.clone();
    let allowed_origins = server_config.cors_allowed_origins.clone();

    info!("Starting HTTP server on {}", addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .wrap(middleware::Logger::default())
            .wrap(build_cors(&allowed_origins))
            .configure(handlers::configure_routes)
    })
    .workers(server_config.worker_threads)
    .keep_alive(Duration::from_secs(HTTP_KEEPALIVE_SECS))
    .client_request_timeout(Duration::from_secs(HTTP_CLIENT_REQUEST_TIMEOUT_SECS))
    .shutdown_timeout(HTTP_SHUTDOWN_TIMEOUT_SECS)
    .disable_signals()
    .bind(addr)
    .map_err(|e| ServerError::Network(format!("Failed to bind HTTP server: {}", e)))?
    .run();

    let handle = server.handle();

    tokio::select! {
        result = server => {
            result.map_err(|e| ServerError::Internal(format!("HTTP server error: {}", e)))?;
        }
        _ = setup_shutdown_signal() => {
            handle.stop(true).await;
        }
    }

    if let Some(task) = cleanup {
        task.abort();
    }
    graceful_shutdown(&data).await;

    info!("HTTP server stopped");
    Ok(())
}

/// Allow-list from configuration, any origin when it is empty
fn build_cors(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-session-token"),
        ])
        .max_age(DEFAULT_CORS_MAX_AGE_SECS)
}

/// Setup graceful shutdown signal handling
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received TERM signal, initiating graceful shutdown");
        },
    }
}

async fn graceful_shutdown(state: &AppState) {
    info!("Starting graceful shutdown sequence");
    state.shutdown().await;
    info!("Graceful shutdown sequence completed");
}
