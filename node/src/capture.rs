// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chunk Capture Pipeline
//!
//! Consumes ordered byte segments from the capture source, assigns each a
//! monotonic index, digests it, and commits the record to the ledger,
//! falling back to the durable pending queue when the ledger is
//! unreachable. Segment ingestion never waits on network I/O: records flow
//! through a per-session channel consumed by a single committer task, which
//! also keeps per-session commit submission in index order.

use crate::errors::NodeError;
use crate::ledger::Ledger;
use provena_core::{
    digest_bytes, ChunkRecord, Digest, DigestAccumulator, FinalRecord, LedgerWrite, SessionId,
};
use provena_persistence::PendingQueue;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Shared handle to the durable queue. `None` means the queue failed to open
/// or was not configured: the node runs without offline durability.
pub type SharedQueue = Arc<Mutex<Option<PendingQueue>>>;

/// Capture lifecycle. Re-entering `Capturing` is rejected until the session
/// in flight reaches `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopping,
    Closed,
}

struct ActiveCapture {
    session_id: SessionId,
    next_index: u64,
    accumulator: DigestAccumulator,
    tx: mpsc::UnboundedSender<LedgerWrite>,
    committer: JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub struct StopSummary {
    pub session_id: SessionId,
    pub final_digest: Digest,
    pub chunk_count: u64,
}

pub struct CapturePipeline {
    ledger: Arc<dyn Ledger>,
    queue: SharedQueue,
    state: CaptureState,
    session: Option<ActiveCapture>,
}

impl CapturePipeline {
    pub fn new(ledger: Arc<dyn Ledger>, queue: SharedQueue) -> Self {
        Self {
            ledger,
            queue,
            state: CaptureState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Begin a new capture session. Requires no session in flight.
    pub fn start_session(&mut self) -> Result<SessionId, NodeError> {
        match self.state {
            CaptureState::Idle | CaptureState::Closed => {}
            other => {
                return Err(NodeError::InvalidState(format!(
                    "cannot start capture while {other:?}"
                )));
            }
        }

        let session_id = SessionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        let committer = spawn_committer(self.ledger.clone(), self.queue.clone(), rx);

        tracing::info!("capture session {} started", session_id);
        self.session = Some(ActiveCapture {
            session_id: session_id.clone(),
            next_index: 0,
            accumulator: DigestAccumulator::new(),
            tx,
            committer,
        });
        self.state = CaptureState::Capturing;
        Ok(session_id)
    }

    /// Ingest one delivered segment; returns its chunk index.
    ///
    /// Digests and hands off without awaiting the ledger, so delivery of the
    /// next segment is never blocked on the commit of this one.
    pub async fn ingest_segment(&mut self, segment: &[u8]) -> Result<u64, NodeError> {
        let session = match (self.state, self.session.as_mut()) {
            (CaptureState::Capturing, Some(session)) => session,
            (state, _) => {
                return Err(NodeError::InvalidState(format!(
                    "cannot ingest segment while {state:?}"
                )));
            }
        };

        let chunk_index = session.next_index;
        session.next_index += 1;

        let record = ChunkRecord {
            session_id: session.session_id.clone(),
            chunk_index,
            digest: digest_bytes(segment),
            captured_at: unix_now(),
        };
        session.accumulator.update(segment);

        if let Err(unsent) = session.tx.send(LedgerWrite::Chunk(record)) {
            // Committer gone (it never closes its receiver itself, so this
            // means the task died). Queue directly rather than lose the record.
            tracing::error!("committer channel closed; queueing record directly");
            enqueue_fallback(&self.queue, unsent.0).await;
        }
        Ok(chunk_index)
    }

    /// Stop the session: emit the concatenation digest as the final record,
    /// drain the committer, and close.
    ///
    /// Completion to `Closed` requires every record to have been committed
    /// or durably enqueued; the enqueue path counts as success of the local
    /// responsibility.
    pub async fn stop_session(&mut self) -> Result<StopSummary, NodeError> {
        let session = match (self.state, self.session.take()) {
            (CaptureState::Capturing, Some(session)) => session,
            (state, session) => {
                self.session = session;
                return Err(NodeError::InvalidState(format!(
                    "cannot stop capture while {state:?}"
                )));
            }
        };
        self.state = CaptureState::Stopping;

        let ActiveCapture {
            session_id,
            next_index: chunk_count,
            accumulator,
            tx,
            committer,
        } = session;

        let final_digest = accumulator.finalize();
        let final_record = FinalRecord {
            session_id: session_id.clone(),
            digest: final_digest,
        };

        // The final record rides the same channel, after every chunk record.
        if let Err(unsent) = tx.send(LedgerWrite::Final(final_record)) {
            tracing::error!("committer channel closed before final record; queueing directly");
            enqueue_fallback(&self.queue, unsent.0).await;
        }
        drop(tx);

        if let Err(e) = committer.await {
            tracing::error!("committer task failed: {}", e);
        }

        self.state = CaptureState::Closed;
        tracing::info!(
            "capture session {} closed after {} chunks",
            session_id,
            chunk_count
        );
        Ok(StopSummary {
            session_id,
            final_digest,
            chunk_count,
        })
    }
}

/// Commit one record to the ledger, falling back to the durable queue.
///
/// With `skip_queue` set (sync replay of already-queued entries) a renewed
/// failure is only logged, never re-enqueued as a duplicate. Returns whether
/// the remote write was acknowledged.
pub async fn submit_write(
    ledger: &dyn Ledger,
    queue: &SharedQueue,
    write: &LedgerWrite,
    skip_queue: bool,
) -> bool {
    let result = match write {
        LedgerWrite::Chunk(record) => ledger.commit_chunk(record).await,
        LedgerWrite::Final(record) => ledger.commit_final(record).await,
    };

    match result {
        Ok(()) => {
            metrics::counter!("provena_ledger_commits_total", 1);
            true
        }
        Err(e) => {
            if skip_queue {
                tracing::debug!("sync replay commit failed, entry stays queued: {}", e);
            } else {
                tracing::warn!("ledger commit failed ({}); queueing for sync", e);
                enqueue_fallback(queue, write.clone()).await;
            }
            false
        }
    }
}

async fn enqueue_fallback(queue: &SharedQueue, write: LedgerWrite) {
    let mut guard = queue.lock().await;
    match guard.as_mut() {
        Some(q) => match q.enqueue(write) {
            Ok(local_id) => {
                metrics::gauge!("provena_queue_depth", q.len() as f64);
                tracing::debug!("queued pending write {}", local_id);
            }
            Err(e) => {
                tracing::error!("pending queue write failed, record lost until re-capture: {}", e);
            }
        },
        None => {
            tracing::error!("no offline durability available; failed commit dropped");
        }
    }
}

fn spawn_committer(
    ledger: Arc<dyn Ledger>,
    queue: SharedQueue,
    mut rx: mpsc::UnboundedReceiver<LedgerWrite>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // One task per session keeps ledger submission in chunk-index order
        // even while digesting of later segments proceeds.
        while let Some(write) = rx.recv().await {
            submit_write(ledger.as_ref(), &queue, &write, false).await;
        }
    })
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
