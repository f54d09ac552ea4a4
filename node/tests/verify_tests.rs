// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use provena_core::{MatchThresholds, SessionId, Verdict};
use provena_node::capture::CapturePipeline;
use provena_node::errors::NodeError;
use provena_node::ledger::MemoryLedger;
use provena_node::verifier::{Verifier, VerifyConfig};
use std::sync::Arc;
use tokio::sync::Mutex;

const WINDOW: usize = 64;

fn verify_config() -> VerifyConfig {
    VerifyConfig {
        window_size: WINDOW,
        thresholds: MatchThresholds::default(),
    }
}

/// Capture `windows` window-aligned segments so chunk digests line up with
/// verifier windows, returning the ledger, session and original bytes.
async fn seeded_session(windows: usize) -> (Arc<MemoryLedger>, SessionId, Vec<u8>) {
    let ledger = Arc::new(MemoryLedger::new());
    let mut pipeline = CapturePipeline::new(ledger.clone(), Arc::new(Mutex::new(None)));

    let session_id = pipeline.start_session().unwrap();
    let mut original = Vec::new();
    for i in 0..windows {
        let segment = vec![i as u8; WINDOW];
        pipeline.ingest_segment(&segment).await.unwrap();
        original.extend_from_slice(&segment);
    }
    pipeline.stop_session().await.unwrap();

    (ledger, session_id, original)
}

fn corrupt_windows(original: &[u8], count: usize) -> Vec<u8> {
    let mut candidate = original.to_vec();
    for w in 0..count {
        candidate[w * WINDOW + 5] ^= 0xFF;
    }
    candidate
}

#[tokio::test]
async fn byte_identical_candidate_is_authentic_full() {
    let (ledger, session_id, original) = seeded_session(10).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&original, Some(session_id.as_str()), None)
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::AuthenticFull);
    assert_eq!(report.confidence, Some(100));
}

#[tokio::test]
async fn unknown_session_has_undefined_confidence() {
    let ledger = Arc::new(MemoryLedger::new());
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(b"whatever", Some(SessionId::generate().as_str()), None)
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::UnknownSession);
    assert_eq!(report.confidence, None);
}

#[tokio::test]
async fn malformed_explicit_id_is_unknown_session() {
    let (ledger, _, original) = seeded_session(4).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&original, Some("definitely-not-a-token"), None)
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::UnknownSession);
}

#[tokio::test]
async fn missing_session_id_fails_before_ledger_io() {
    let ledger = Arc::new(MemoryLedger::new());
    // Offline ledger: the call must fail on input validation, not I/O.
    ledger.set_online(false);
    let verifier = Verifier::new(ledger, verify_config());

    let err = verifier
        .verify(b"candidate", None, Some("holiday.webm"))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::MissingSessionId));
}

#[tokio::test]
async fn filename_token_resolves_session() {
    let (ledger, session_id, original) = seeded_session(6).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&original, None, Some(&format!("recording-{session_id}.webm")))
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::AuthenticFull);
}

#[tokio::test]
async fn single_flipped_byte_scores_remaining_windows() {
    let (ledger, session_id, original) = seeded_session(20).await;
    let verifier = Verifier::new(ledger, verify_config());

    let candidate = corrupt_windows(&original, 1);
    let report = verifier
        .verify(&candidate, Some(session_id.as_str()), None)
        .await
        .unwrap();

    // 19/20 = 0.95: full match fails, windowed comparison carries it.
    assert_eq!(report.verdict, Verdict::AuthenticPartial);
    assert_eq!(report.matched_windows, 19);
    assert_eq!(report.total_windows, 20);
    assert_eq!(report.confidence, Some(95));
    assert!(!report.windows[0].matched);
    assert!(report.windows[1].matched);
}

#[tokio::test]
async fn flipped_byte_in_short_session_is_partial() {
    let (ledger, session_id, original) = seeded_session(5).await;
    let verifier = Verifier::new(ledger, verify_config());

    let candidate = corrupt_windows(&original, 1);
    let report = verifier
        .verify(&candidate, Some(session_id.as_str()), None)
        .await
        .unwrap();

    // 4/5 = 0.80 sits between the thresholds.
    assert_eq!(report.verdict, Verdict::Partial);
    assert_eq!(report.confidence, Some(80));
}

#[tokio::test]
async fn ratio_exactly_at_authentic_threshold() {
    let (ledger, session_id, original) = seeded_session(10).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&corrupt_windows(&original, 1), Some(session_id.as_str()), None)
        .await
        .unwrap();
    // 9/10 = 0.90 inclusive.
    assert_eq!(report.verdict, Verdict::AuthenticPartial);
    assert_eq!(report.confidence, Some(90));
}

#[tokio::test]
async fn ratio_exactly_at_partial_threshold() {
    let (ledger, session_id, original) = seeded_session(10).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&corrupt_windows(&original, 6), Some(session_id.as_str()), None)
        .await
        .unwrap();
    // 4/10 = 0.40 inclusive.
    assert_eq!(report.verdict, Verdict::Partial);
    assert_eq!(report.confidence, Some(40));
}

#[tokio::test]
async fn ratio_below_partial_threshold_is_fake() {
    let (ledger, session_id, original) = seeded_session(10).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&corrupt_windows(&original, 7), Some(session_id.as_str()), None)
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::Fake);
    assert_eq!(report.confidence, Some(30));
}

#[tokio::test]
async fn truncated_candidate_matches_all_its_windows() {
    let (ledger, session_id, original) = seeded_session(10).await;
    let verifier = Verifier::new(ledger, verify_config());

    // First half only: every surviving window matches, but the whole-file
    // digest does not, so the verdict cannot be the full claim.
    let report = verifier
        .verify(&original[..5 * WINDOW], Some(session_id.as_str()), None)
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::AuthenticPartial);
    assert_eq!(report.confidence, Some(100));
    assert_eq!(report.total_windows, 5);
}

#[tokio::test]
async fn empty_candidate_for_known_session_is_fake() {
    let (ledger, session_id, _) = seeded_session(3).await;
    let verifier = Verifier::new(ledger, verify_config());

    let report = verifier
        .verify(&[], Some(session_id.as_str()), None)
        .await
        .unwrap();
    assert_eq!(report.verdict, Verdict::Fake);
    assert_eq!(report.confidence, Some(0));
    assert_eq!(report.total_windows, 0);
}

#[tokio::test]
async fn offline_ledger_fails_verification_retryably() {
    let (ledger, session_id, original) = seeded_session(3).await;
    ledger.set_online(false);
    let verifier = Verifier::new(ledger, verify_config());

    let err = verifier
        .verify(&original, Some(session_id.as_str()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Ledger(_)));
}
