// HTTP handlers
pub mod auth_handler;
pub mod health;

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;
use tracing::debug;

use crate::utils::response::error_response;

/// Malformed JSON bodies become 400 `{"error":"Invalid request payload"}`
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("Rejected request body: {}", err);
        InternalError::from_response(
            err,
            error_response(StatusCode::BAD_REQUEST, "Invalid request payload"),
        )
        .into()
    })
}

fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/signup", web::post().to(auth_handler::signup))
        .route("/login", web::post().to(auth_handler::login))
        .route("/profile", web::get().to(auth_handler::profile))
        .route("/session", web::get().to(auth_handler::session))
        .route("/logout", web::post().to(auth_handler::logout));
}

/// Every route the service exposes; auth routes also live under `/api/auth`
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health::health_check))
        .route("/health/live", web::get().to(health::liveness_check))
        .route("/health/ready", web::get().to(health::readiness_check))
        .configure(auth_routes)
        .service(web::scope("/api/auth").configure(auth_routes));
}
