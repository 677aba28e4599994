use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::app::ingest_use_case::IngestUseCase;
use crate::app::ports::DeliveryAck;
use crate::auth;
use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::pipeline::enrich::RequestMeta;
use crate::pipeline::schemas::{
    GymEntryBody, GymEntryVariant, IdentifyBody, NewMemberContractBody, TrackBody,
    UserIdentifyBody,
};

/// Response envelope returned by every event route.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

impl ApiResponse {
    pub fn success(event_id: String, docs: String) -> Self {
        Self {
            status: "success",
            message: "Event processed successfully".to_string(),
            event_id: Some(event_id),
            docs: Some(docs),
        }
    }

    pub fn error(message: String, docs: String) -> Self {
        Self {
            status: "error",
            message,
            event_id: None,
            docs: Some(docs),
        }
    }
}

/// Maps a use-case outcome onto the response envelope. Validation failures
/// are client errors listing every violation; delivery failures surface as a
/// gateway error; anything else is logged in full and reported generically.
fn respond(
    result: Result<DeliveryAck, GatewayError>,
    docs: String,
) -> Response {
    match result {
        Ok(ack) => (
            StatusCode::OK,
            Json(ApiResponse::success(ack.message_id, docs)),
        )
            .into_response(),
        Err(GatewayError::Validation(violations)) => {
            let message = violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(message, docs)),
            )
                .into_response()
        }
        Err(GatewayError::Delivery(failure)) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(failure.to_string(), docs)),
        )
            .into_response(),
        Err(other) => {
            error!(error = %other, "unexpected gateway error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Internal server error".to_string(), docs)),
            )
                .into_response()
        }
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cdp-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn request_meta(headers: &HeaderMap, connect_info: Option<ConnectInfo<SocketAddr>>) -> RequestMeta {
    RequestMeta::from_request(headers, connect_info.map(|info| info.0))
}

async fn track(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<TrackBody>,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(ingest.track(body, meta).await, config.docs_url())
}

async fn identify(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<IdentifyBody>,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(ingest.identify(body, meta).await, config.docs_url())
}

async fn check_in_granted(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<GymEntryBody>,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(
        ingest.check_in(GymEntryVariant::Granted, body, meta).await,
        config.docs_url(),
    )
}

async fn check_in_denied(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<GymEntryBody>,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(
        ingest.check_in(GymEntryVariant::Denied, body, meta).await,
        config.docs_url(),
    )
}

async fn register_new_member(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<UserIdentifyBody>,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(ingest.register_member(body, meta).await, config.docs_url())
}

async fn register_new_contract(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<NewMemberContractBody>,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(ingest.register_contract(body, meta).await, config.docs_url())
}

async fn register_sample(
    Extension(ingest): Extension<Arc<IngestUseCase>>,
    Extension(config): Extension<Arc<AppConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let meta = request_meta(&headers, connect_info);
    respond(ingest.sample(meta).await, config.docs_url())
}

/// Create the HTTP server with all routes.
pub fn create_server(config: Arc<AppConfig>, ingest: Arc<IngestUseCase>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let event_routes = Router::new()
        .route("/track", post(track))
        .route("/identify", post(identify))
        .route("/user/check-in/granted", post(check_in_granted))
        .route("/user/check-in/denied", post(check_in_denied))
        .route("/user/register/new-member", post(register_new_member))
        .route("/user/register/new-contract", post(register_new_contract))
        .route("/user/register/sample", post(register_sample))
        .route_layer(middleware::from_fn(auth::require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(event_routes)
        .layer(Extension(config))
        .layer(Extension(ingest))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    config: Arc<AppConfig>,
    ingest: Arc<IngestUseCase>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(config, ingest);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");

    Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}
