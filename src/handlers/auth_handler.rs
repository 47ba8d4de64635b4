use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::auth::AuthError;
use crate::config::constants::{SESSION_COOKIE_NAME, SESSION_HEADER_NAME};
use crate::server::app_state::AppState;
use crate::services::SignupRequest;

/// Login body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /signup`
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AuthError> {
    let account = state.auth.signup(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "user_id": account.id })))
}

/// `POST /login`: token and session id in the body, token also as a cookie
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    let LoginRequest { email, password } = body.into_inner();
    let outcome = state.auth.login(&email, &password).await?;

    let cookie = session_cookie(
        &outcome.token,
        outcome.token_expires_at,
        state.config.auth.cookie_secure,
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "token": outcome.token,
        "session_id": outcome.session_id,
        "expires_at": outcome.token_expires_at,
        "session_expires_at": outcome.session_expires_at,
        "user": outcome.account,
    })))
}

/// `GET /profile`: bearer header first, then the `session_token` cookie
pub async fn profile(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AuthError> {
    let token = extract_token(&req).ok_or(AuthError::MissingToken)?;
    let account = state.auth.validate_token(&token).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// `GET /session`: validate and slide the session named by `X-Session-Token`
pub async fn session(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AuthError> {
    let session_id = session_header(&req).ok_or(AuthError::InvalidSession)?;
    let account = state.auth.validate_session(&session_id).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// `POST /logout`: drop the session and clear the cookie
pub async fn logout(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AuthError> {
    if let Some(session_id) = session_header(&req) {
        state.auth.logout(&session_id).await?;
    }
    Ok(HttpResponse::NoContent()
        .cookie(clear_session_cookie(state.config.auth.cookie_secure))
        .finish())
}

/// Bearer token from `Authorization`, falling back to the session cookie
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
        })
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        req.cookie(SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

fn session_header(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(SESSION_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// HttpOnly, SameSite=Strict cookie carrying the bearer token
pub fn session_cookie<'a>(token: &str, expires_at: DateTime<Utc>, secure: bool) -> Cookie<'a> {
    let expires = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()).unwrap_or_else(|_| {
        warn!(
            "Token expiry {} is out of cookie range; using 24h",
            expires_at.timestamp()
        );
        OffsetDateTime::now_utc() + CookieDuration::hours(24)
    });

    Cookie::build(SESSION_COOKIE_NAME, token.to_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .expires(expires)
        .finish()
}

fn clear_session_cookie<'a>(secure: bool) -> Cookie<'a> {
    Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .cookie(Cookie::new(SESSION_COOKIE_NAME, "from-cookie"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE_NAME, "from-cookie"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(extract_token(&req), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(extract_token(&req), None);
    }

    #[test]
    fn session_cookie_flags() {
        let expires_at = Utc::now() + chrono::Duration::hours(24);
        let cookie = session_cookie("tok", expires_at, true);

        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(expires_at.timestamp())
        );
    }
}
