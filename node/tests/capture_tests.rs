// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use provena_core::{digest_bytes, LedgerWrite};
use provena_node::capture::{CapturePipeline, CaptureState, SharedQueue};
use provena_node::ledger::{Ledger, MemoryLedger};
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::Mutex;

fn no_queue() -> SharedQueue {
    Arc::new(Mutex::new(None))
}

fn durable_queue(dir: &tempfile::TempDir) -> SharedQueue {
    let queue = provena_persistence::PendingQueue::open(dir.path().join("pending.log")).unwrap();
    Arc::new(Mutex::new(Some(queue)))
}

#[tokio::test]
async fn capture_commits_ordered_chunks_and_final() {
    let ledger = Arc::new(MemoryLedger::new());
    let mut pipeline = CapturePipeline::new(ledger.clone(), no_queue());

    let session_id = pipeline.start_session().unwrap();
    assert_eq!(pipeline.state(), CaptureState::Capturing);

    let segments: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 100 + i as usize]).collect();
    for (i, seg) in segments.iter().enumerate() {
        let idx = pipeline.ingest_segment(seg).await.unwrap();
        assert_eq!(idx, i as u64);
    }

    let summary = pipeline.stop_session().await.unwrap();
    assert_eq!(summary.chunk_count, 8);
    assert_eq!(pipeline.state(), CaptureState::Closed);

    // Indices land 0..N-1 gap-free and in order, with exact segment digests.
    let chunks = ledger.get_chunks(&session_id).await.unwrap();
    let indices: Vec<u64> = chunks.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<u64>>());
    for (chunk, seg) in chunks.iter().zip(&segments) {
        assert_eq!(chunk.digest, digest_bytes(seg));
    }

    // The final digest is the digest of the delivery-order concatenation.
    let mut concat = Vec::new();
    for seg in &segments {
        concat.extend_from_slice(seg);
    }
    let stored = ledger.get_final(&session_id).await.unwrap().unwrap();
    assert_eq!(stored.digest, digest_bytes(&concat));
    assert_eq!(stored.digest, summary.final_digest);
}

#[tokio::test]
async fn double_start_is_rejected() {
    let ledger = Arc::new(MemoryLedger::new());
    let mut pipeline = CapturePipeline::new(ledger, no_queue());

    pipeline.start_session().unwrap();
    assert!(pipeline.start_session().is_err());
}

#[tokio::test]
async fn ingest_and_stop_require_capturing() {
    let ledger = Arc::new(MemoryLedger::new());
    let mut pipeline = CapturePipeline::new(ledger, no_queue());

    assert!(pipeline.ingest_segment(b"early").await.is_err());
    assert!(pipeline.stop_session().await.is_err());
    assert_eq!(pipeline.state(), CaptureState::Idle);
}

#[tokio::test]
async fn closed_pipeline_starts_fresh_session() {
    let ledger = Arc::new(MemoryLedger::new());
    let mut pipeline = CapturePipeline::new(ledger, no_queue());

    let first = pipeline.start_session().unwrap();
    pipeline.ingest_segment(b"segment").await.unwrap();
    pipeline.stop_session().await.unwrap();

    let second = pipeline.start_session().unwrap();
    assert_ne!(first, second);
    // Index restarts at zero for the new session.
    assert_eq!(pipeline.ingest_segment(b"segment").await.unwrap(), 0);
    pipeline.stop_session().await.unwrap();
}

#[tokio::test]
async fn offline_capture_queues_every_record() {
    let dir = tempdir().unwrap();
    let queue = durable_queue(&dir);
    let ledger = Arc::new(MemoryLedger::new());
    ledger.set_online(false);

    let mut pipeline = CapturePipeline::new(ledger.clone(), queue.clone());
    let session_id = pipeline.start_session().unwrap();
    for i in 0..3u8 {
        pipeline.ingest_segment(&[i; 50]).await.unwrap();
    }
    pipeline.stop_session().await.unwrap();

    // Nothing reached the ledger.
    ledger.set_online(true);
    assert_eq!(ledger.chunk_count(&session_id), 0);
    assert!(ledger.get_final(&session_id).await.unwrap().is_none());

    // Every record is pending, chunks in index order before the final.
    let guard = queue.lock().await;
    let pending = guard.as_ref().unwrap().list_all();
    assert_eq!(pending.len(), 4);
    for (i, entry) in pending.iter().take(3).enumerate() {
        match &entry.payload {
            LedgerWrite::Chunk(record) => assert_eq!(record.chunk_index, i as u64),
            other => panic!("expected chunk record, got {other:?}"),
        }
    }
    assert!(matches!(pending[3].payload, LedgerWrite::Final(_)));
}
