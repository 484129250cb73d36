//! bookclub/crates/bc-api/src/middleware.rs Middleware
//!
//! Request logging, CORS and session resolution.

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::{Logger, Next};
use actix_web::{web, HttpMessage, HttpRequest};
use tracing::debug;

use crate::error::ApiError;
use crate::handlers::AppState;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "bookclub_session";

// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// An empty origin list allows any origin.
pub fn cors_policy(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

/// Bearer token first, then the session cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Resolves the caller once per request and leaves the [`bc_core::Session`]
/// in the request extensions. Unknown or expired tokens are anonymous.
pub async fn resolve_session(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if let Some(token) = session_token(req.request()) {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| ApiError::internal("application state is not registered"))?;

        match state
            .services
            .accounts
            .resolve_session(&token)
            .await
            .map_err(ApiError::from)?
        {
            Some(session) => {
                req.extensions_mut().insert(session);
            }
            None => debug!("request with unknown or expired session token"),
        }
    }

    next.call(req).await
}
