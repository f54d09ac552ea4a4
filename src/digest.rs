// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Digest Engine
//!
//! All attestation content hashing goes through here: one-shot digests over
//! materialized bytes, streaming digests from a lazily-read source, and an
//! accumulator for the whole-session concatenation digest.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Read;

pub const DIGEST_LEN: usize = 32;

/// A 256-bit content digest. Rendered as 64 lowercase hex chars on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s).map_err(|e| CoreError::InvalidDigest(e.to_string()))?;
        let bytes: [u8; DIGEST_LEN] = raw
            .try_into()
            .map_err(|_| CoreError::InvalidDigest(format!("expected {DIGEST_LEN} bytes")))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

// Hex string on the wire, matching the ledger's stored form.
impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Digest a fully materialized byte sequence. Deterministic, no side
/// effects, safe to call concurrently on independent inputs.
pub fn digest_bytes(bytes: &[u8]) -> Digest {
    Digest(*blake3::hash(bytes).as_bytes())
}

/// Digest a lazily-provided byte source.
///
/// A read failure is propagated to the caller, never swallowed.
pub fn digest_reader<R: Read>(mut reader: R) -> Result<Digest> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest(*hasher.finalize().as_bytes()))
}

/// Incremental digest over an ordered byte stream.
///
/// Fed each captured segment in delivery order, `finalize` yields the digest
/// of the full concatenation without the segments being retained.
pub struct DigestAccumulator {
    hasher: blake3::Hasher,
    bytes_seen: u64,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            bytes_seen: 0,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.bytes_seen += bytes.len() as u64;
    }

    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    pub fn finalize(&self) -> Digest {
        Digest(*self.hasher.finalize().as_bytes())
    }
}

impl Default for DigestAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn digest_is_deterministic() {
        let data = b"segment payload";
        assert_eq!(digest_bytes(data), digest_bytes(data));
        assert_ne!(digest_bytes(data), digest_bytes(b"segment payloae"));
    }

    #[test]
    fn reader_matches_bytes() {
        let data = vec![7u8; 200_000]; // spans multiple read buffers
        let from_reader = digest_reader(&data[..]).unwrap();
        assert_eq!(from_reader, digest_bytes(&data));
    }

    #[test]
    fn accumulator_matches_concatenation() {
        let segments: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 1000 + i as usize]).collect();

        let mut acc = DigestAccumulator::new();
        let mut concat = Vec::new();
        for seg in &segments {
            acc.update(seg);
            concat.extend_from_slice(seg);
        }

        assert_eq!(acc.finalize(), digest_bytes(&concat));
        assert_eq!(acc.bytes_seen(), concat.len() as u64);
    }

    #[test]
    fn hex_round_trip() {
        let d = digest_bytes(b"round trip");
        let hex = d.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Digest::from_hex(&hex).unwrap(), d);
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(Digest::from_hex("not hex").is_err());
        assert!(Digest::from_hex("abcd").is_err()); // too short
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device gone"))
        }
    }

    #[test]
    fn reader_failure_propagates() {
        let err = digest_reader(FailingReader).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
