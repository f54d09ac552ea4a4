// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Sync Coordinator
//!
//! Drains the pending queue after connectivity returns, or on explicit
//! request. Writes replay in ascending local-id order (the original
//! happens-before order across chunk and final records) and an entry is
//! removed only once the ledger acknowledges it.

use crate::capture::{submit_write, SharedQueue};
use crate::ledger::Ledger;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub remaining: usize,
}

pub struct SyncCoordinator {
    ledger: Arc<dyn Ledger>,
    queue: SharedQueue,
}

impl SyncCoordinator {
    pub fn new(ledger: Arc<dyn Ledger>, queue: SharedQueue) -> Self {
        Self { ledger, queue }
    }

    /// One replay pass over a snapshot of the queue.
    ///
    /// Queue-skip semantics: a renewed failure leaves the entry in place for
    /// the next trigger, never duplicated. Safe to run while capture keeps
    /// enqueuing: each invocation re-reads the list, and removal is atomic
    /// with respect to concurrent listing.
    pub async fn run_once(&self) -> SyncReport {
        let snapshot = {
            let guard = self.queue.lock().await;
            match guard.as_ref() {
                Some(q) => q.list_all(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            return SyncReport::default();
        }

        tracing::info!("sync pass over {} pending writes", snapshot.len());
        let mut report = SyncReport::default();

        for entry in snapshot {
            if submit_write(self.ledger.as_ref(), &self.queue, &entry.payload, true).await {
                let mut guard = self.queue.lock().await;
                if let Some(q) = guard.as_mut() {
                    match q.remove(entry.local_id) {
                        Ok(()) => {
                            metrics::gauge!("provena_queue_depth", q.len() as f64);
                            report.synced += 1;
                        }
                        Err(e) => {
                            tracing::error!(
                                "failed to drop confirmed write {}: {}",
                                entry.local_id,
                                e
                            );
                            report.failed += 1;
                        }
                    }
                }
            } else {
                report.failed += 1;
            }
        }

        report.remaining = {
            let guard = self.queue.lock().await;
            guard.as_ref().map(|q| q.len()).unwrap_or(0)
        };

        metrics::counter!("provena_sync_synced_total", report.synced as u64);
        tracing::info!(
            "sync pass complete: {} synced, {} failed, {} remaining",
            report.synced,
            report.failed,
            report.remaining
        );
        report
    }

    /// Pending writes currently awaiting confirmation.
    pub async fn pending_count(&self) -> usize {
        let guard = self.queue.lock().await;
        guard.as_ref().map(|q| q.len()).unwrap_or(0)
    }
}

/// React to connectivity-changed notifications delivered by the host
/// environment through the watch channel. No internal polling.
pub fn spawn_connectivity_listener(
    coordinator: Arc<SyncCoordinator>,
    mut rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = *rx.borrow();
            if online {
                tracing::info!("connectivity restored; draining pending queue");
                coordinator.run_once().await;
            } else {
                tracing::info!("connectivity lost; commits will queue locally");
            }
        }
    })
}
