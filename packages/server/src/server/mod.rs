//! HTTP front door: a thin Axum layer over the Lifecycle API.
pub mod app;
pub mod routes;

pub use app::{build_app, AppState};
