//! `echo`: accepts any payload and "delivers" it by returning it unchanged.
//! Exists for local development and the scenario tests — never reaches the
//! network.

use async_trait::async_trait;

use crate::core::driver::{Driver, DriverSendError};

pub struct EchoDriver;

#[async_trait]
impl Driver for EchoDriver {
    fn kind(&self) -> &str {
        "echo"
    }

    fn verify(&self, _payload: &[u8]) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn send(&self, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>, DriverSendError> {
        let mut response = format!("echo to {endpoint}: ").into_bytes();
        response.extend_from_slice(payload);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_echoes_endpoint_and_payload() {
        let driver = EchoDriver;
        let resp = driver.send("dest", b"hi").await.unwrap();
        assert_eq!(resp, b"echo to dest: hi".to_vec());
    }
}
