//! Delivery adapter posting normalized payloads to the Segment ingestion
//! API, authenticated with the shared write key via HTTP basic auth.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::app::ports::{DeliveryAck, DeliveryFailure, DeliveryPort};
use crate::pipeline::schemas::EventKind;

const DEFAULT_BASE_URL: &str = "https://api.segment.io/v1";

pub struct SegmentClient {
    client: reqwest::Client,
    base_url: String,
    write_key: String,
}

impl SegmentClient {
    pub fn new(write_key: String) -> Self {
        Self::with_base_url(write_key, DEFAULT_BASE_URL.to_string())
    }

    /// Overridable endpoint, used to point the adapter at a local stub.
    pub fn with_base_url(write_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            write_key,
        }
    }

    fn endpoint(&self, kind: EventKind) -> String {
        format!("{}/{}", self.base_url, kind.as_str())
    }
}

#[async_trait]
impl DeliveryPort for SegmentClient {
    async fn deliver(
        &self,
        kind: EventKind,
        payload: &Value,
    ) -> Result<DeliveryAck, DeliveryFailure> {
        let response = self
            .client
            .post(self.endpoint(kind))
            .basic_auth(&self.write_key, Some(""))
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryFailure {
                status_code: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryFailure {
                status_code: Some(status.as_u16()),
                body,
            });
        }

        // Segment's ack body carries no useful id; mint one for the caller.
        Ok(DeliveryAck {
            message_id: Uuid::new_v4().to_string(),
        })
    }
}
