use std::env;

use crate::error::{GatewayError, Result};

/// Immutable process-wide configuration, loaded once at startup and shared
/// read-only with the auth gate and the delivery client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared secret authorizing writes into the downstream ingestion platform.
    pub write_key: String,
    /// Allow-listed API keys accepted in the `X-API-Key` header.
    pub api_keys: Vec<String>,
    /// Base domain used only to build the documentation link in responses.
    pub base_domain: String,
    /// Port the HTTP server binds to.
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let write_key = env::var("SEGMENT_WRITE_KEY")
            .map_err(|_| GatewayError::Config("SEGMENT_WRITE_KEY is not set".to_string()))?;

        let api_keys: Vec<String> = env::var("API_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base_domain = env::var("BASE_DOMAIN").unwrap_or_default();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| GatewayError::Config(format!("Invalid PORT '{raw}': {e}")))?,
            Err(_) => 8080,
        };

        Ok(Self {
            write_key,
            api_keys,
            base_domain,
            port,
        })
    }

    /// Documentation link included in response envelopes.
    pub fn docs_url(&self) -> String {
        format!("{}/docs", self.base_domain)
    }

    pub fn is_allowed_key(&self, key: &str) -> bool {
        self.api_keys.iter().any(|k| k == key)
    }
}
