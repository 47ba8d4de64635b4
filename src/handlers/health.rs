use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;

use crate::server::app_state::AppState;

/// HTTP health check endpoint
pub async fn health_check() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// HTTP liveness check endpoint
pub async fn liveness_check() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// HTTP readiness check endpoint; 503 unless both stores answer
pub async fn readiness_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let (accounts_ok, sessions_ok) = state.auth.stores_ready().await;
    let ready = accounts_ok && sessions_ok;

    let body = json!({
        "status": if ready { "ready" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "credential_store": {
                "type": state.auth.storage_type(),
                "ok": accounts_ok
            },
            "session_store": {
                "type": state.auth.session_store_type(),
                "ok": sessions_ok
            }
        }
    });

    if ready {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(body))
    }
}
