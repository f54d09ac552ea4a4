// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tower_http::cors::CorsLayer;

use axum::extract::Request as AxumRequest;
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;

use crate::api::*;
use crate::capture::{CapturePipeline, SharedQueue};
use crate::errors::NodeError;
use crate::ledger::Ledger;
use crate::sync::{SyncCoordinator, SyncReport};
use crate::verifier::{Verifier, VerifyConfig};
use provena_core::VerificationReport;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Mutex<CapturePipeline>>,
    pub coordinator: Arc<SyncCoordinator>,
    pub verifier: Arc<Verifier>,
    pub queue: SharedQueue,
    /// Connectivity-changed notifications from the host environment.
    pub connectivity: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, queue: SharedQueue, verify_config: VerifyConfig) -> Self {
        let (tx, _rx) = watch::channel(true);
        Self {
            pipeline: Arc::new(Mutex::new(CapturePipeline::new(
                ledger.clone(),
                queue.clone(),
            ))),
            coordinator: Arc::new(SyncCoordinator::new(ledger.clone(), queue.clone())),
            verifier: Arc::new(Verifier::new(ledger, verify_config)),
            queue,
            connectivity: Arc::new(tx),
        }
    }
}

async fn auth_guard(
    State(token): State<Arc<Option<String>>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(token_str) = &*token {
        let auth_header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|val| val.to_str().ok())
            .filter(|val| val.starts_with("Bearer "));

        if let Some(val) = auth_header {
            let provided = val.trim_start_matches("Bearer ");
            if provided == token_str {
                return Ok(next.run(req).await);
            }
        }
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(state: AppState, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        .route("/v1/capture/start", post(capture_start))
        .route("/v1/capture/segment", post(capture_segment))
        .route("/v1/capture/stop", post(capture_stop))
        .route("/v1/capture/state", get(capture_state))
        .route("/v1/verify", post(verify_candidate))
        .route("/v1/sync/run", post(sync_run))
        .route("/v1/connectivity", post(set_connectivity))
        .route("/v1/queue", get(queue_status))
        // Observability
        .route("/metrics", get(metrics_handler))
        // The capture client is a browser
        .layer(CorsLayer::permissive())
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        let auth_state = Arc::new(Some(token));
        app = app.layer(from_fn_with_state(auth_state, auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app
}

async fn capture_start(
    State(state): State<AppState>,
) -> Result<Json<StartSessionResponse>, NodeError> {
    let mut pipeline = state.pipeline.lock().await;
    let session_id = pipeline.start_session()?;
    Ok(Json(StartSessionResponse { session_id }))
}

async fn capture_segment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestSegmentResponse>, NodeError> {
    let mut pipeline = state.pipeline.lock().await;
    let chunk_index = pipeline.ingest_segment(&body).await?;
    Ok(Json(IngestSegmentResponse { chunk_index }))
}

async fn capture_stop(
    State(state): State<AppState>,
) -> Result<Json<StopSessionResponse>, NodeError> {
    let mut pipeline = state.pipeline.lock().await;
    let summary = pipeline.stop_session().await?;
    Ok(Json(StopSessionResponse {
        session_id: summary.session_id,
        final_digest: summary.final_digest,
        chunk_count: summary.chunk_count,
    }))
}

// Observers query the state machine instead of mirroring it.
async fn capture_state(State(state): State<AppState>) -> Json<CaptureStateResponse> {
    let pipeline = state.pipeline.lock().await;
    Json(CaptureStateResponse {
        state: pipeline.state(),
    })
}

async fn verify_candidate(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
    body: Bytes,
) -> Result<Json<VerificationReport>, NodeError> {
    let report = state
        .verifier
        .verify(&body, params.session_id.as_deref(), params.filename.as_deref())
        .await?;
    Ok(Json(report))
}

async fn sync_run(State(state): State<AppState>) -> Json<SyncReport> {
    Json(state.coordinator.run_once().await)
}

async fn set_connectivity(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    // The listener reacts to the transition; send_replace never fails.
    state.connectivity.send_replace(req.online);
    Json(ConnectivityResponse { online: req.online })
}

async fn queue_status(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    let pending = {
        let guard = state.queue.lock().await;
        guard.as_ref().map(|q| q.len()).unwrap_or(0)
    };
    Json(QueueStatusResponse { pending })
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
