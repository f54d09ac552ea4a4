// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("invalid capture state: {0}")]
    InvalidState(String),

    /// No explicit session id and none extractable from the filename.
    /// Reported before any ledger call.
    #[error("missing session identifier")]
    MissingSessionId,

    /// Ledger read failed; the verification call is retryable.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("queue storage error: {0}")]
    Queue(#[from] provena_persistence::PersistenceError),

    #[error("digest error: {0}")]
    Digest(#[from] provena_core::CoreError),
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            NodeError::InvalidState(msg) => (StatusCode::CONFLICT, msg.clone()),
            NodeError::MissingSessionId => {
                (StatusCode::BAD_REQUEST, "missing session identifier".to_string())
            }
            NodeError::Ledger(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            NodeError::Queue(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            NodeError::Digest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
