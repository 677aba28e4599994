use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::schemas::EventKind;

/// Acknowledgement from the downstream ingestion platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAck {
    pub message_id: String,
}

/// A rejected or failed delivery. `status_code` is absent for transport
/// failures that never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub status_code: Option<u16>,
    pub body: String,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "downstream returned {}: {}", status, self.body),
            None => write!(f, "transport error: {}", self.body),
        }
    }
}

/// Outbound delivery of a normalized payload. Called exactly once per
/// request; retry and backoff policy, if any, belong to the implementor.
#[async_trait]
pub trait DeliveryPort: Send + Sync {
    async fn deliver(&self, kind: EventKind, payload: &Value)
        -> Result<DeliveryAck, DeliveryFailure>;
}
