//! Context enrichment: merging caller-supplied device context with
//! request-observed metadata (client IP, user agent).
//!
//! Each schema's documented nesting is preserved exactly: device-nested
//! shapes get `ip`/`userAgent` as siblings of `device`, flat shapes get them
//! merged at the top level with caller keys winning.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::HeaderMap;
use serde_json::{json, Map, Value};

/// Metadata observed on the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Prefers the first `X-Forwarded-For` hop over the socket peer address.
    pub fn from_request(headers: &HeaderMap, remote: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = forwarded.or_else(|| remote.map(|addr| addr.ip().to_string()));

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Self { ip, user_agent }
    }

    fn ip_value(&self) -> Value {
        match &self.ip {
            Some(ip) => Value::String(ip.clone()),
            None => Value::Null,
        }
    }

    fn user_agent_value(&self) -> Value {
        Value::String(self.user_agent.clone().unwrap_or_default())
    }
}

/// Wraps an already-resolved device object with `ip`/`userAgent` siblings.
pub fn device_nested_context(device: Value, meta: &RequestMeta) -> Value {
    json!({
        "device": device,
        "ip": meta.ip_value(),
        "userAgent": meta.user_agent_value(),
    })
}

/// Merges caller device keys over the observed defaults (`user_agent`,
/// `ip_address`), caller winning on collision.
pub fn contract_device(caller: &BTreeMap<String, Value>, meta: &RequestMeta) -> Value {
    let mut device = Map::new();
    device.insert("user_agent".to_string(), meta.user_agent_value());
    device.insert("ip_address".to_string(), meta.ip_value());
    for (key, value) in caller {
        device.insert(key.clone(), value.clone());
    }
    Value::Object(device)
}

/// Flat merge for the generic shapes: synthetic `ip`/`userAgent` first, then
/// caller keys on top.
pub fn flat_context(caller: Option<&Value>, meta: &RequestMeta) -> Value {
    let mut merged = Map::new();
    merged.insert("ip".to_string(), meta.ip_value());
    merged.insert("userAgent".to_string(), meta.user_agent_value());
    if let Some(Value::Object(caller)) = caller {
        for (key, value) in caller {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}
