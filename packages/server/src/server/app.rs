//! Application state and router assembly.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::Lifecycle;
use crate::server::routes;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<Lifecycle>,
}

pub fn build_app(lifecycle: Arc<Lifecycle>) -> Router {
    let state = AppState { lifecycle };

    Router::new()
        .route("/send", post(routes::send_handler))
        .route("/sendOnce", post(routes::send_once_handler))
        .route("/resend", post(routes::resend_handler))
        .route("/result", post(routes::result_handler))
        .route("/status", post(routes::status_handler))
        .route("/detail", post(routes::detail_handler))
        .route("/delete", post(routes::delete_handler))
        .route("/clear", post(routes::clear_handler))
        .route("/forceClear", post(routes::force_clear_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
