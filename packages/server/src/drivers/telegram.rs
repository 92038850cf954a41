//! `telegram`: posts `sendMessage` to the Telegram Bot API with
//! `parse_mode=MarkdownV2`. `endpoint` is looked up in an optional alias map
//! (configured at construction) before falling back to treating it as a
//! literal chat id directly — the original's `dest` map, made optional since
//! most deployments will just pass the chat id straight through.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::driver::{Driver, DriverSendError};

#[derive(Debug, Serialize, Deserialize)]
struct TelegramPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramDriver {
    client: Client,
    bot_token: String,
    dest: HashMap<String, String>,
}

impl TelegramDriver {
    pub fn new(bot_token: impl Into<String>, dest: HashMap<String, String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builder should not fail with default settings"),
            bot_token: bot_token.into(),
            dest,
        }
    }

    /// Confirms the bot token is accepted by calling `getMe`. The original
    /// ran this check at construction; here it is exposed separately since
    /// an HTTP call cannot run inside a sync constructor.
    pub async fn verify_token(&self) -> Result<(), anyhow::Error> {
        let url = format!("https://api.telegram.org/bot{}/getMe", self.bot_token);
        let resp: SendMessageResponse = self.client.get(url).send().await?.json().await?;
        if !resp.ok {
            anyhow::bail!(
                "telegram rejected bot token: {}",
                resp.description.unwrap_or_default()
            );
        }
        Ok(())
    }

    fn chat_id<'a>(&'a self, endpoint: &'a str) -> &'a str {
        self.dest.get(endpoint).map(String::as_str).unwrap_or(endpoint)
    }
}

#[async_trait]
impl Driver for TelegramDriver {
    fn kind(&self) -> &str {
        "telegram"
    }

    fn verify(&self, payload: &[u8]) -> Result<(), anyhow::Error> {
        let parsed = serde_json::from_slice::<TelegramPayload>(payload)?;
        if parsed.text.is_empty() {
            anyhow::bail!("telegram text must not be empty");
        }
        Ok(())
    }

    async fn send(&self, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>, DriverSendError> {
        let parsed: TelegramPayload = serde_json::from_slice(payload)
            .map_err(|e| DriverSendError::new(format!("malformed payload: {e}")))?;

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let form = [
            ("chat_id", self.chat_id(endpoint)),
            ("text", parsed.text.as_str()),
            ("parse_mode", "MarkdownV2"),
        ];

        let response = self.client.post(url).form(&form).send().await?;
        let body = response.bytes().await?.to_vec();
        let decoded: SendMessageResponse = serde_json::from_slice(&body)
            .map_err(|e| DriverSendError::with_response(format!("unparseable response: {e}"), body.clone()))?;

        if decoded.ok {
            Ok(body)
        } else {
            Err(DriverSendError::with_response(
                decoded.description.unwrap_or_else(|| "telegram rejected message".into()),
                body,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_falls_back_to_endpoint_when_unmapped() {
        let driver = TelegramDriver::new("token", HashMap::new());
        assert_eq!(driver.chat_id("12345"), "12345");
    }

    #[test]
    fn chat_id_resolves_through_alias_map() {
        let mut dest = HashMap::new();
        dest.insert("ops".to_string(), "-100999".to_string());
        let driver = TelegramDriver::new("token", dest);
        assert_eq!(driver.chat_id("ops"), "-100999");
    }

    #[test]
    fn verify_rejects_missing_text_field() {
        let driver = TelegramDriver::new("token", HashMap::new());
        assert!(driver.verify(b"{}").is_err());
    }

    #[test]
    fn verify_rejects_empty_text() {
        let driver = TelegramDriver::new("token", HashMap::new());
        assert!(driver.verify(br#"{"text":""}"#).is_err());
    }

    #[test]
    fn verify_accepts_nonempty_text() {
        let driver = TelegramDriver::new("token", HashMap::new());
        assert!(driver.verify(br#"{"text":"hi"}"#).is_ok());
    }
}
