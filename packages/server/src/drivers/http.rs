//! `http`: a generic webhook driver. Payload is `{headers, body, expect_prefix}`;
//! `endpoint` is the destination URL. A response is only a delivery failure
//! if its body does *not* start with `expect_prefix` — the original's
//! `StringValidator` computed that prefix match and then discarded it,
//! unconditionally erroring. Here the match result is the actual verdict.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::driver::{Driver, DriverSendError};

#[derive(Debug, Serialize, Deserialize)]
struct HttpPayload {
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    expect_prefix: String,
}

pub struct HttpDriver {
    client: Client,
}

impl HttpDriver {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builder should not fail with default settings"),
        }
    }
}

impl Default for HttpDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for HttpDriver {
    fn kind(&self) -> &str {
        "http"
    }

    fn verify(&self, payload: &[u8]) -> Result<(), anyhow::Error> {
        serde_json::from_slice::<HttpPayload>(payload)?;
        Ok(())
    }

    async fn send(&self, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>, DriverSendError> {
        let parsed: HttpPayload = serde_json::from_slice(payload)
            .map_err(|e| DriverSendError::new(format!("malformed payload: {e}")))?;

        let mut request = self.client.post(endpoint).body(parsed.body);
        for (name, value) in &parsed.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status.is_success() && body.starts_with(parsed.expect_prefix.as_bytes()) {
            Ok(body)
        } else {
            Err(DriverSendError::with_response(
                format!("response status {status} did not match expected prefix"),
                body,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_rejects_malformed_json() {
        let driver = HttpDriver::new();
        assert!(driver.verify(b"not json").is_err());
    }

    #[test]
    fn verify_accepts_missing_optional_fields() {
        let driver = HttpDriver::new();
        assert!(driver.verify(b"{}").is_ok());
    }
}
