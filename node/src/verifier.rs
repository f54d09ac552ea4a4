// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Reconstructive Verifier
//!
//! Rebuilds comparable digests from an arbitrary candidate file and scores
//! them against the session's committed digests. The whole-file match is
//! exact; the windowed fallback is a heuristic (set membership over fixed
//! windows) robust to benign repackaging but not a cryptographic proof.

use crate::errors::NodeError;
use crate::ledger::Ledger;
use provena_core::{
    digest_bytes, window_digests, windowed_report, MatchThresholds, SessionId,
    VerificationReport, DEFAULT_WINDOW_SIZE,
};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub window_size: usize,
    pub thresholds: MatchThresholds,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            thresholds: MatchThresholds::default(),
        }
    }
}

pub struct Verifier {
    ledger: Arc<dyn Ledger>,
    config: VerifyConfig,
}

impl Verifier {
    pub fn new(ledger: Arc<dyn Ledger>, config: VerifyConfig) -> Self {
        Self { ledger, config }
    }

    /// Verify a candidate against a session's committed digests.
    ///
    /// The session id is the explicit one when given, otherwise extracted
    /// from a `recording-<uuid>` filename. Either way it is untrusted input
    /// and goes through the identical ledger lookup; a malformed explicit
    /// token can never be on the ledger and verdicts as an unknown session.
    /// With neither source available the call fails before any ledger I/O.
    pub async fn verify(
        &self,
        candidate: &[u8],
        explicit_session_id: Option<&str>,
        filename: Option<&str>,
    ) -> Result<VerificationReport, NodeError> {
        let session_id = match explicit_session_id {
            Some(raw) => match SessionId::parse(raw) {
                Some(id) => Some(id),
                None => return Ok(VerificationReport::unknown_session()),
            },
            None => filename.and_then(session_id_from_filename),
        };
        let session_id = session_id.ok_or(NodeError::MissingSessionId)?;

        metrics::counter!("provena_verifications_total", 1);

        let whole_file = digest_bytes(candidate);
        let final_record = self.ledger.get_final(&session_id).await?;

        if let Some(final_record) = &final_record {
            if final_record.digest == whole_file {
                tracing::info!("session {} verified by full match", session_id);
                return Ok(VerificationReport::authentic_full());
            }
        }

        let chunks = self.ledger.get_chunks(&session_id).await?;
        if final_record.is_none() && chunks.is_empty() {
            return Ok(VerificationReport::unknown_session());
        }

        let committed: HashSet<_> = chunks.into_iter().map(|c| c.digest).collect();
        let windows = window_digests(candidate, self.config.window_size);
        let report = windowed_report(&windows, &committed, &self.config.thresholds);
        tracing::info!(
            "session {} windowed verdict {:?} ({}/{} windows)",
            session_id,
            report.verdict,
            report.matched_windows,
            report.total_windows
        );
        Ok(report)
    }
}

/// Pull a session token out of a `recording-<uuid>` style filename.
/// The extracted value is validated, never trusted.
pub fn session_id_from_filename(filename: &str) -> Option<SessionId> {
    const PREFIX: &str = "recording-";
    let start = filename.find(PREFIX)? + PREFIX.len();
    let token = filename.get(start..start + 36)?;
    SessionId::parse(token)
}
