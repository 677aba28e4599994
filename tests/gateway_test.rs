use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use cdp_gateway::app::ingest_use_case::IngestUseCase;
use cdp_gateway::app::ports::{DeliveryAck, DeliveryFailure, DeliveryPort};
use cdp_gateway::config::AppConfig;
use cdp_gateway::pipeline::schemas::EventKind;
use cdp_gateway::server;

struct StubDelivery {
    calls: Mutex<Vec<(EventKind, Value)>>,
    failure: Option<DeliveryFailure>,
}

impl StubDelivery {
    fn acking() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: None,
        })
    }

    fn failing(status_code: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(DeliveryFailure {
                status_code: Some(status_code),
                body: body.to_string(),
            }),
        })
    }

    fn calls(&self) -> Vec<(EventKind, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryPort for StubDelivery {
    async fn deliver(
        &self,
        kind: EventKind,
        payload: &Value,
    ) -> std::result::Result<DeliveryAck, DeliveryFailure> {
        self.calls.lock().unwrap().push((kind, payload.clone()));
        match &self.failure {
            None => Ok(DeliveryAck {
                message_id: "msg-e2e".to_string(),
            }),
            Some(failure) => Err(failure.clone()),
        }
    }
}

fn test_router(delivery: Arc<StubDelivery>) -> Router {
    let config = Arc::new(AppConfig {
        write_key: "wk".to_string(),
        api_keys: vec!["test-key".to_string()],
        base_domain: "https://gateway.example.com".to_string(),
        port: 0,
    });
    server::create_server(config, Arc::new(IngestUseCase::new(delivery)))
}

async fn post_json(
    app: Router,
    path: &str,
    api_key: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Value)> {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "UA")
        .header("x-forwarded-for", "1.2.3.4");
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    let response = app
        .oneshot(request.body(Body::from(body.to_string()))?)
        .await?;
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

fn new_member_body() -> Value {
    json!({
        "type": "identify",
        "userId": "B0027-14602",
        "traits": {
            "id": "B0027-14602",
            "firstName": "Kaye",
            "lastName": "Kua",
            "email": "example@gmail.com",
            "birthday": "2000-12-25",
            "gender": "F",
            "address": {
                "zipCode": "10117",
                "state": "Berlin",
                "country_alpha2": "DE"
            },
            "phone": "+4901234567"
        }
    })
}

fn granted_body() -> Value {
    json!({
        "userId": "B0027-14602",
        "type": "track",
        "event": "gym_entry_granted",
        "properties": {
            "cardId": "HID-987654321",
            "reason": "active_member",
            "direction": "inbound"
        },
        "context": { "device": { "cardReaderId": "TDR-B0027-01", "branchId": "B0027" } },
        "timestamp": "2024-05-01T08:30:00Z"
    })
}

#[tokio::test]
async fn health_needs_no_api_key() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn missing_api_key_is_unauthorized() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, body) =
        post_json(app, "/user/register/new-member", None, new_member_body()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "API key missing");
    assert!(delivery.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_api_key_is_forbidden() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, body) = post_json(
        app,
        "/user/register/new-member",
        Some("wrong-key"),
        new_member_body(),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid API key");
    assert!(delivery.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn unparseable_api_key_is_forbidden_not_missing() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    // A key was supplied, it just is not valid UTF-8; that is an invalid
    // key, not a missing one.
    let request = Request::builder()
        .method("POST")
        .uri("/user/register/new-member")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", HeaderValue::from_bytes(b"\xfftest-key")?)
        .body(Body::from(new_member_body().to_string()))?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let bytes = hyper::body::to_bytes(response.into_body()).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["message"], "Invalid API key");
    assert!(delivery.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn new_member_end_to_end_success() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, body) = post_json(
        app,
        "/user/register/new-member",
        Some("test-key"),
        new_member_body(),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["event_id"], "msg-e2e");
    assert_eq!(body["docs"], "https://gateway.example.com/docs");

    let calls = delivery.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, EventKind::Identify);
    let payload = &calls[0].1;
    assert_eq!(payload["userId"], "B0027-14602");
    assert_eq!(payload["traits"]["birthday"], "2000-12-25");
    // Age was derived during validation
    assert!(payload["traits"]["age"].is_i64());
    assert_eq!(payload["context"]["ip"], "1.2.3.4");
    assert_eq!(payload["context"]["userAgent"], "UA");
    Ok(())
}

#[tokio::test]
async fn delivery_failure_surfaces_without_retry() -> Result<()> {
    let delivery = StubDelivery::failing(400, "bad write key");
    let app = test_router(delivery.clone());
    let (status, body) = post_json(
        app,
        "/user/register/new-member",
        Some("test-key"),
        new_member_body(),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("400"));
    assert!(body["message"].as_str().unwrap().contains("bad write key"));
    // Exactly one outbound call: the gateway does not retry
    assert_eq!(delivery.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn granted_with_denial_reason_is_rejected_before_delivery() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let mut body = granted_body();
    body["properties"]["reason"] = json!("expired_membership");
    let (status, response) =
        post_json(app, "/user/check-in/granted", Some("test-key"), body).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("properties.reason"));
    assert!(delivery.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn granted_check_in_delivers_track_event() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, _) =
        post_json(app, "/user/check-in/granted", Some("test-key"), granted_body()).await?;
    assert_eq!(status, StatusCode::OK);

    let calls = delivery.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, EventKind::Track);
    let payload = &calls[0].1;
    assert_eq!(payload["event"], "gym_entry_granted");
    assert_eq!(payload["context"]["device"]["cardReaderId"], "TDR-B0027-01");
    // branchName was defaulted during validation, not dropped
    assert_eq!(payload["context"]["device"]["branchName"], "");
    assert_eq!(payload["timestamp"], "2024-05-01T08:30:00.000Z");
    Ok(())
}

#[tokio::test]
async fn contract_context_is_enriched() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, _) = post_json(
        app,
        "/user/register/new-contract",
        Some("test-key"),
        json!({
            "userId": "B0027-14602",
            "properties": { "tarifName": "FLEX", "tarifFee": 10.0 },
            "context": { "device": { "brand": "Apple" } }
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let calls = delivery.calls();
    let payload = &calls[0].1;
    assert_eq!(payload["properties"]["currency"], "EUR");
    assert_eq!(payload["context"]["device"]["brand"], "Apple");
    assert_eq!(payload["context"]["device"]["user_agent"], "UA");
    assert_eq!(payload["context"]["device"]["ip_address"], "1.2.3.4");
    assert_eq!(payload["context"]["ip"], "1.2.3.4");
    assert_eq!(payload["context"]["userAgent"], "UA");
    Ok(())
}

#[tokio::test]
async fn generic_track_passes_anonymous_id_through() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, _) = post_json(
        app,
        "/track",
        Some("test-key"),
        json!({
            "userId": "B0027-14602",
            "event": "door_opened",
            "properties": { "doorId": "D-1" },
            "anonymousId": "anon-123"
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let calls = delivery.calls();
    assert_eq!(calls[0].1["anonymousId"], "anon-123");
    assert_eq!(calls[0].1["properties"]["doorId"], "D-1");
    Ok(())
}

#[tokio::test]
async fn sample_route_delivers_demo_profile() -> Result<()> {
    let delivery = StubDelivery::acking();
    let app = test_router(delivery.clone());
    let (status, body) =
        post_json(app, "/user/register/sample", Some("test-key"), Value::Null).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let calls = delivery.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, EventKind::Identify);
    assert_eq!(calls[0].1["traits"]["firstName"], "Kaye");
    Ok(())
}
