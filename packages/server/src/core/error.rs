//! Error taxonomy for the dispatch engine.
//!
//! `NotFound` is always its own variant — never folded into a generic "store
//! error" — because the HTTP front door maps it to 404 while every other
//! `StoreError` maps to 500 (§6/§7 of the spec).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate id")]
    DuplicateId,
    #[error("notification is processing, cannot delete")]
    InUse,
    #[error(transparent)]
    Transient(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("unsupported driver: {0}")]
    UnknownDriver(String),
    #[error("unsupported payload: {0}")]
    InvalidPayload(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
