//! The nine notification routes. Every body is JSON, every outcome is
//! carried in the status code — bodies are empty except `/result` (raw
//! bytes), `/status`, and `/detail`.
//!
//! Bodies are pulled as raw `Bytes` and decoded with `serde_json::from_slice`
//! rather than axum's `Json` extractor: per §6 "`Content-Type` is ignored,"
//! matching the original's unconditional `json.NewDecoder(r.Body)`, whereas
//! `Json` 415s a request with no/wrong `Content-Type` header. It also lets a
//! decode failure (malformed JSON, or a required field like `Params.id`
//! missing) map uniformly to the 400 §6 mandates, instead of axum's 422 for
//! the latter case.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::{ItemDetail, ItemStatus, LifecycleError, Params, StoreError};
use crate::server::app::AppState;

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, StatusCode> {
    serde_json::from_slice(body).map_err(|_| StatusCode::BAD_REQUEST)
}

fn map_lifecycle_error(err: LifecycleError) -> StatusCode {
    match err {
        LifecycleError::UnknownDriver(_) | LifecycleError::InvalidPayload(_) => {
            StatusCode::BAD_REQUEST
        }
        LifecycleError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn submit(state: &AppState, params: Params, retry: bool) -> StatusCode {
    if params.id.is_empty() || params.driver.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    match state.lifecycle.submit(params, retry).await {
        Ok(()) => StatusCode::OK,
        Err(err) => map_lifecycle_error(err),
    }
}

pub async fn send_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    match decode::<Params>(&body) {
        Ok(params) => submit(&state, params, true).await,
        Err(status) => status,
    }
}

pub async fn send_once_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    match decode::<Params>(&body) {
        Ok(params) => submit(&state, params, false).await,
        Err(status) => status,
    }
}

#[derive(Debug, Deserialize)]
pub struct IdBody {
    #[serde(default)]
    pub id: String,
}

pub async fn resend_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let body: IdBody = match decode(&body) {
        Ok(body) => body,
        Err(status) => return status,
    };
    if body.id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    match state.lifecycle.resend(&body.id).await {
        Ok(()) => StatusCode::OK,
        Err(err) => map_lifecycle_error(err),
    }
}

pub async fn result_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let body: IdBody = match decode(&body) {
        Ok(body) => body,
        Err(status) => return status.into_response(),
    };
    if body.id.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    match state.lifecycle.result(&body.id).await {
        Ok(bytes) => (
            StatusCode::OK,
            [("content-type", "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(err) => map_lifecycle_error(err).into_response(),
    }
}

pub async fn status_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ItemStatus>, StatusCode> {
    let body: IdBody = decode(&body)?;
    if body.id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .lifecycle
        .status(&body.id)
        .await
        .map(Json)
        .map_err(map_lifecycle_error)
}

pub async fn detail_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ItemDetail>, StatusCode> {
    let body: IdBody = decode(&body)?;
    if body.id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .lifecycle
        .detail(&body.id)
        .await
        .map(Json)
        .map_err(map_lifecycle_error)
}

pub async fn delete_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let body: IdBody = match decode(&body) {
        Ok(body) => body,
        Err(status) => return status,
    };
    if body.id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    match state.lifecycle.delete(&body.id).await {
        Ok(()) => StatusCode::OK,
        Err(err) => map_lifecycle_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct BeforeBody {
    pub before: i64,
}

pub async fn clear_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let body: BeforeBody = match decode(&body) {
        Ok(body) => body,
        Err(status) => return status,
    };
    match state.lifecycle.clear(body.before).await {
        Ok(()) => StatusCode::OK,
        Err(err) => map_lifecycle_error(err),
    }
}

pub async fn force_clear_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let body: BeforeBody = match decode(&body) {
        Ok(body) => body,
        Err(status) => return status,
    };
    match state.lifecycle.force_clear(body.before).await {
        Ok(()) => StatusCode::OK,
        Err(err) => map_lifecycle_error(err),
    }
}
