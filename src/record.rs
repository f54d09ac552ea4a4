// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Attestation record types shared between capture, queue, and verifier.

use crate::digest::Digest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One capture session's identifier: a 128-bit random token,
/// string-rendered as a lowercase hyphenated UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate an untrusted candidate string. Accepts any case; the stored
    /// form is normalized to lowercase hyphenated.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(u.as_hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A committed per-segment fingerprint.
///
/// Immutable once created; the digest covers exactly the delivered segment
/// bytes, never padded or re-framed. Indices ascend gap-free per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub session_id: SessionId,
    pub chunk_index: u64,
    pub digest: Digest,
    /// Unix seconds at capture time.
    pub captured_at: u64,
}

/// The end-of-capture fingerprint over the ordered concatenation of all
/// segment bytes. Written once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRecord {
    pub session_id: SessionId,
    pub digest: Digest,
}

/// A ledger write awaiting remote confirmation. The payload carried by the
/// pending queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerWrite {
    Chunk(ChunkRecord),
    Final(FinalRecord),
}

impl LedgerWrite {
    pub fn session_id(&self) -> &SessionId {
        match self {
            LedgerWrite::Chunk(record) => &record.session_id,
            LedgerWrite::Final(record) => &record.session_id,
        }
    }
}
