//! Driver Registry (§4.B): a one-shot, pre-`Start` mapping of driver name to
//! transport plugin. Registration happens while building the registry;
//! wrapping the finished registry in `Arc` is what makes it immutable for the
//! lifetime of the process — there is no interior mutability to guard.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// The outcome of a failed `Driver::send`. Carries whatever response bytes
/// the transport did manage to read back, so the worker can persist them
/// without re-deriving them from the error message.
#[derive(Debug)]
pub struct DriverSendError {
    pub message: String,
    pub response: Option<Vec<u8>>,
}

impl DriverSendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(message: impl Into<String>, response: Vec<u8>) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }
}

impl fmt::Display for DriverSendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DriverSendError {}

impl From<reqwest::Error> for DriverSendError {
    fn from(err: reqwest::Error) -> Self {
        DriverSendError::new(err.to_string())
    }
}

/// Transport plugin contract (§6 "Driver contract"): a globally unique name,
/// a fast synchronous payload validator run at submission time, and a
/// network-calling `send` invoked only from worker tasks.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Globally unique driver name, matched against `Params.driver`/`Item.driver`.
    fn kind(&self) -> &str;

    /// Fast, synchronous payload check, run once at `submit` time.
    fn verify(&self, payload: &[u8]) -> Result<(), anyhow::Error>;

    /// Deliver `payload` to `endpoint`. Called only from a worker task; may
    /// block on the network for as long as the transport's own timeout allows.
    async fn send(&self, endpoint: &str, payload: &[u8]) -> Result<Vec<u8>, DriverSendError>;
}

/// Immutable-after-construction map of driver name to plugin.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver. Intended to be called only before the engine is
    /// started; there is nothing stopping a caller from doing it later, but
    /// the Dispatcher snapshots the driver name list once at `start()`.
    pub fn register(mut self, driver: Arc<dyn Driver>) -> Self {
        self.drivers.insert(driver.kind().to_string(), driver);
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.drivers.contains_key(kind)
    }

    /// Snapshot of registered driver names, passed to `Store::pending` as the
    /// `enabled_drivers` filter.
    pub fn driver_names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }
}
