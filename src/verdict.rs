// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Verdict classification for candidate files.
//!
//! Only the whole-file match is exact. The windowed comparison is a
//! robustness heuristic: window digests are checked against the *set* of
//! committed chunk digests, so benign repackaging that shifts byte offsets
//! but preserves byte-identical regions still scores, at the cost of
//! tamper-localization precision. Callers must not treat a windowed verdict
//! as cryptographic proof.

use crate::digest::Digest;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ratio cutoffs for the windowed verdict.
///
/// Empirical constants carried over from the capture deployment;
/// configurable parameters, not invariants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    pub authentic: f64,
    pub partial: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            authentic: 0.90,
            partial: 0.40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    AuthenticFull,
    AuthenticPartial,
    Partial,
    Fake,
    UnknownSession,
}

/// Per-window comparison outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowReport {
    pub index: u32,
    pub digest: Digest,
    pub matched: bool,
}

/// The transient result of one verification call. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    /// 0–100; absent when the session is unknown to the ledger.
    pub confidence: Option<u8>,
    pub matched_windows: usize,
    pub total_windows: usize,
    pub windows: Vec<WindowReport>,
}

impl VerificationReport {
    /// The ledger holds no record at all for the session.
    pub fn unknown_session() -> Self {
        Self {
            verdict: Verdict::UnknownSession,
            confidence: None,
            matched_windows: 0,
            total_windows: 0,
            windows: Vec::new(),
        }
    }

    /// Whole-file digest equals the committed final digest: the strongest
    /// possible claim.
    pub fn authentic_full() -> Self {
        Self {
            verdict: Verdict::AuthenticFull,
            confidence: Some(100),
            matched_windows: 0,
            total_windows: 0,
            windows: Vec::new(),
        }
    }
}

/// Classify a windowed match ratio. Thresholds are inclusive lower bounds.
pub fn classify_ratio(ratio: f64, thresholds: &MatchThresholds) -> Verdict {
    if ratio >= thresholds.authentic {
        Verdict::AuthenticPartial
    } else if ratio >= thresholds.partial {
        Verdict::Partial
    } else {
        Verdict::Fake
    }
}

/// Score window digests against the session's committed digest set.
///
/// Aggregation is order-independent set membership. Zero windows is FAKE
/// with confidence 0.
pub fn windowed_report(
    window_digests: &[Digest],
    committed: &HashSet<Digest>,
    thresholds: &MatchThresholds,
) -> VerificationReport {
    let windows: Vec<WindowReport> = window_digests
        .iter()
        .enumerate()
        .map(|(i, d)| WindowReport {
            index: i as u32,
            digest: *d,
            matched: committed.contains(d),
        })
        .collect();

    let total = windows.len();
    if total == 0 {
        return VerificationReport {
            verdict: Verdict::Fake,
            confidence: Some(0),
            matched_windows: 0,
            total_windows: 0,
            windows,
        };
    }

    let matched = windows.iter().filter(|w| w.matched).count();
    let ratio = matched as f64 / total as f64;

    VerificationReport {
        verdict: classify_ratio(ratio, thresholds),
        confidence: Some((ratio * 100.0).round() as u8),
        matched_windows: matched,
        total_windows: total,
        windows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest_bytes;

    #[test]
    fn ratio_boundaries_are_inclusive() {
        let t = MatchThresholds::default();
        assert_eq!(classify_ratio(1.0, &t), Verdict::AuthenticPartial);
        assert_eq!(classify_ratio(0.90, &t), Verdict::AuthenticPartial);
        assert_eq!(classify_ratio(0.899, &t), Verdict::Partial);
        assert_eq!(classify_ratio(0.40, &t), Verdict::Partial);
        assert_eq!(classify_ratio(0.399, &t), Verdict::Fake);
        assert_eq!(classify_ratio(0.0, &t), Verdict::Fake);
    }

    #[test]
    fn report_counts_set_membership() {
        let committed: HashSet<Digest> =
            ["a", "b", "c"].iter().map(|s| digest_bytes(s.as_bytes())).collect();
        // Matching is positional-order independent.
        let windows = vec![
            digest_bytes(b"c"),
            digest_bytes(b"x"),
            digest_bytes(b"a"),
            digest_bytes(b"b"),
        ];

        let report = windowed_report(&windows, &committed, &MatchThresholds::default());
        assert_eq!(report.matched_windows, 3);
        assert_eq!(report.total_windows, 4);
        assert_eq!(report.confidence, Some(75));
        assert_eq!(report.verdict, Verdict::Partial);
        assert!(!report.windows[1].matched);
    }

    #[test]
    fn zero_windows_is_fake_with_zero_confidence() {
        let report = windowed_report(&[], &HashSet::new(), &MatchThresholds::default());
        assert_eq!(report.verdict, Verdict::Fake);
        assert_eq!(report.confidence, Some(0));
    }

    #[test]
    fn confidence_rounds() {
        let committed: HashSet<Digest> = [digest_bytes(b"w")].into_iter().collect();
        let windows = vec![digest_bytes(b"w"), digest_bytes(b"x"), digest_bytes(b"y")];
        // 1/3 -> 33.33 -> 33
        let report = windowed_report(&windows, &committed, &MatchThresholds::default());
        assert_eq!(report.confidence, Some(33));
    }
}
