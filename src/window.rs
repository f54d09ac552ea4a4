// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed-width windowed digesting of a candidate byte sequence.
//!
//! Windows are independent of the original capture's segment boundaries: a
//! transcoded or re-muxed candidate will not align to them, which is why the
//! verifier matches digests by set membership rather than position.

use crate::digest::{digest_bytes, Digest};
use rayon::prelude::*;

/// Default window width: 1 MiB.
pub const DEFAULT_WINDOW_SIZE: usize = 1024 * 1024;

/// Digest non-overlapping fixed-size windows of `candidate`.
///
/// The trailing window may be short; empty input yields no windows. Windows
/// are digested in parallel, returned in file order.
pub fn window_digests(candidate: &[u8], window_size: usize) -> Vec<Digest> {
    assert!(window_size > 0, "window size must be non-zero");
    candidate.par_chunks(window_size).map(digest_bytes).collect()
}
