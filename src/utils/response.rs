use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;

/// JSON body shared by every failure response
pub fn error_body(message: &str) -> serde_json::Value {
    json!({ "error": message })
}

/// Build a `{"error": ...}` response with the given status
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(error_body(message))
}
