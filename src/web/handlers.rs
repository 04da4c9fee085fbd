//! HTTP handlers for the store gateway

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, Request, State,
    },
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::StoreClient;
use crate::protocol::{Code, Status};

/// Shared application state
pub type AppState = Arc<dyn StoreClient>;

const INVALID_INPUT: &str = "Invalid input";
const MISSING_KEY: &str = "Missing key";
const PAYLOAD_TOO_LARGE: &str = "Payload too large";

/// Request body for `PUT /store`
#[derive(Debug, Deserialize)]
pub struct PutRequestBody {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Response carrying only a status word
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
}

/// Response for a successful lookup
#[derive(Debug, Serialize)]
pub struct KeyValueBody {
    pub key: String,
    pub value: String,
}

/// Response for any failure
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// Gateway operation, used to pick the failure rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Put,
    Get,
    Delete,
}

impl Operation {
    /// Operation served for an HTTP method on the store routes
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::PUT => Some(Operation::Put),
            Method::GET => Some(Operation::Get),
            Method::DELETE => Some(Operation::Delete),
            _ => None,
        }
    }
}

/// HTTP rendering of a failed RPC call
///
/// Put and Delete report every failure as a server error, InvalidArgument
/// and NotFound included. Get reports every failure as a missing key.
/// The code does not change the rendering, and callers never pass
/// `Code::Ok`.
pub fn failure_response(op: Operation, _code: Code) -> (StatusCode, &'static str) {
    match op {
        Operation::Put => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store value"),
        Operation::Get => (StatusCode::NOT_FOUND, "Key not found"),
        Operation::Delete => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete"),
    }
}

fn error(status: StatusCode, message: &'static str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn failure(op: Operation, key: &str, status: &Status) -> Response {
    let (http_status, message) = failure_response(op, status.code());
    warn!("{:?} {:?} failed: {} -> {}", op, key, status, http_status);
    error(http_status, message)
}

/// Extract a non-empty key from the path
fn path_key(key: Result<Path<String>, PathRejection>) -> Option<String> {
    match key {
        Ok(Path(key)) if !key.is_empty() => Some(key),
        Ok(_) => None,
        Err(e) => {
            debug!("Rejected key path: {}", e);
            None
        }
    }
}

/// Render a request that ran out of time like an `Internal` failure
///
/// The timeout layer answers with a bare 408; this swaps in the JSON body
/// the operation would have produced.
pub async fn timeout_as_failure(request: Request, next: Next) -> Response {
    let op = Operation::from_method(request.method());
    let uri = request.uri().clone();
    let response = next.run(request).await;

    match op {
        Some(op) if response.status() == StatusCode::REQUEST_TIMEOUT => {
            warn!("{:?} {} timed out", op, uri);
            let (http_status, message) = failure_response(op, Code::Internal);
            error(http_status, message)
        }
        _ => response,
    }
}

/// `PUT /store`
///
/// The body is decoded as JSON whatever its content type. A body that does
/// not decode, or lacks a non-empty key and value, never reaches the store.
pub async fn put_value(
    State(client): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            debug!("PUT /store rejected: {}", e);
            return error(StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE);
        }
        Err(e) => {
            debug!("PUT /store rejected: {}", e);
            return error(StatusCode::BAD_REQUEST, INVALID_INPUT);
        }
    };

    let req = match serde_json::from_slice::<PutRequestBody>(&body) {
        Ok(req) if !req.key.is_empty() && !req.value.is_empty() => req,
        Ok(_) => {
            debug!("PUT /store rejected: empty key or value");
            return error(StatusCode::BAD_REQUEST, INVALID_INPUT);
        }
        Err(e) => {
            debug!("PUT /store rejected: {}", e);
            return error(StatusCode::BAD_REQUEST, INVALID_INPUT);
        }
    };

    match client.put(&req.key, &req.value).await {
        Ok(()) => (StatusCode::OK, Json(StatusBody { status: "ok" })).into_response(),
        Err(status) => failure(Operation::Put, &req.key, &status),
    }
}

/// `GET /store/:key`
pub async fn get_value(
    State(client): State<AppState>,
    key: Result<Path<String>, PathRejection>,
) -> Response {
    let Some(key) = path_key(key) else {
        return error(StatusCode::BAD_REQUEST, MISSING_KEY);
    };

    match client.get(&key).await {
        Ok(value) => (StatusCode::OK, Json(KeyValueBody { key, value })).into_response(),
        Err(status) => failure(Operation::Get, &key, &status),
    }
}

/// `DELETE /store/:key`
pub async fn delete_value(
    State(client): State<AppState>,
    key: Result<Path<String>, PathRejection>,
) -> Response {
    let Some(key) = path_key(key) else {
        return error(StatusCode::BAD_REQUEST, MISSING_KEY);
    };

    match client.delete(&key).await {
        Ok(()) => (StatusCode::OK, Json(StatusBody { status: "deleted" })).into_response(),
        Err(status) => failure(Operation::Delete, &key, &status),
    }
}

/// `GET` or `DELETE` on `/store` or `/store/`
pub async fn missing_key() -> Response {
    error(StatusCode::BAD_REQUEST, MISSING_KEY)
}
