//! `sms`: delivers via Twilio's Messages API. `endpoint` is the destination
//! phone number; payload is `{body}`. Grounded on the original's
//! `smsav8d` driver (a flat `{content, subject, ...}` struct posted to a
//! single gateway endpoint) but backed by the `twilio` crate already vendored
//! in this workspace rather than every8d's HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::driver::{Driver, DriverSendError};
use twilio::{SmsOptions, TwilioService};

#[derive(Debug, Serialize, Deserialize)]
struct SmsPayload {
    body: String,
}

pub struct SmsDriver {
    options: SmsOptions,
}

impl SmsDriver {
    pub fn new(options: SmsOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Driver for SmsDriver {
    fn kind(&self) -> &str {
        "sms"
    }

    fn verify(&self, payload: &[u8]) -> Result<(), anyhow::Error> {
        let parsed: SmsPayload = serde_json::from_slice(payload)?;
        if parsed.body.is_empty() {
            anyhow::bail!("sms body must not be empty");
        }
        Ok(())
    }

    async fn send(&self, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>, DriverSendError> {
        let parsed: SmsPayload = serde_json::from_slice(payload)
            .map_err(|e| DriverSendError::new(format!("malformed payload: {e}")))?;

        let response = TwilioService::send_sms(&self.options, endpoint, &parsed.body)
            .await
            .map_err(DriverSendError::new)?;

        serde_json::to_vec(&response)
            .map_err(|e| DriverSendError::new(format!("could not encode twilio response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> SmsDriver {
        SmsDriver::new(SmsOptions {
            account_sid: "AC_test".into(),
            auth_token: "token".into(),
            from: "+15555550100".into(),
        })
    }

    #[test]
    fn verify_rejects_empty_body() {
        let payload = serde_json::to_vec(&SmsPayload { body: String::new() }).unwrap();
        assert!(driver().verify(&payload).is_err());
    }

    #[test]
    fn verify_accepts_nonempty_body() {
        let payload = serde_json::to_vec(&SmsPayload {
            body: "hello".into(),
        })
        .unwrap();
        assert!(driver().verify(&payload).is_ok());
    }
}
