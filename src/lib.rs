// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! provena-core: digest engine, attestation records, and verdict math for
//! tamper-evident incremental media capture.

pub mod digest;
pub mod error;
pub mod record;
pub mod verdict;
pub mod window;

pub use digest::{digest_bytes, digest_reader, Digest, DigestAccumulator, DIGEST_LEN};
pub use error::{CoreError, Result};
pub use record::{ChunkRecord, FinalRecord, LedgerWrite, SessionId};
pub use verdict::{
    classify_ratio, windowed_report, MatchThresholds, VerificationReport, Verdict, WindowReport,
};
pub use window::{window_digests, DEFAULT_WINDOW_SIZE};
