// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use provena_core::{Digest, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
}

#[derive(Serialize)]
pub struct IngestSegmentResponse {
    pub chunk_index: u64,
}

#[derive(Serialize)]
pub struct StopSessionResponse {
    pub session_id: SessionId,
    pub final_digest: Digest,
    pub chunk_count: u64,
}

#[derive(Deserialize)]
pub struct VerifyParams {
    pub session_id: Option<String>,
    /// Fallback source for the session id (`recording-<uuid>` convention).
    pub filename: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Serialize, Debug)]
pub struct ConnectivityResponse {
    pub online: bool,
}

#[derive(Serialize, Debug)]
pub struct QueueStatusResponse {
    pub pending: usize,
}

#[derive(Serialize)]
pub struct CaptureStateResponse {
    pub state: crate::capture::CaptureState,
}
