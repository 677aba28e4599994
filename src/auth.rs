//! API-key gate applied to every event route. Requests failing here are
//! rejected before any pipeline code runs.

use std::sync::Arc;

use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::warn;

use crate::config::AppConfig;
use crate::server::ApiResponse;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Missing key -> 401, key outside the allow-list -> 403.
pub async fn require_api_key<B>(
    Extension(config): Extension<Arc<AppConfig>>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    match request.headers().get(API_KEY_HEADER) {
        None => {
            warn!(path = %request.uri().path(), "request without API key");
            reject(StatusCode::UNAUTHORIZED, "API key missing", &config)
        }
        // A supplied key that is unparseable or outside the allow-list is
        // invalid, not missing
        Some(value) => match value.to_str() {
            Ok(key) if config.is_allowed_key(key) => next.run(request).await,
            _ => {
                warn!(path = %request.uri().path(), "request with unknown API key");
                reject(StatusCode::FORBIDDEN, "Invalid API key", &config)
            }
        },
    }
}

fn reject(status: StatusCode, message: &str, config: &AppConfig) -> Response {
    (
        status,
        Json(ApiResponse::error(message.to_string(), config.docs_url())),
    )
        .into_response()
}
