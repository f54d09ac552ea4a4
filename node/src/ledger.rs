// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger interface and backends.
//!
//! The ledger is the append-only remote authority for committed digests.
//! Two logical tables: per-chunk digests keyed by (session_id, chunk_index)
//! and final digests keyed by session_id. Commits are idempotent upserts on
//! the remote key, so a replayed write is harmless.

use async_trait::async_trait;
use provena_core::{ChunkRecord, Digest, FinalRecord, SessionId};
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Network(String),

    #[error("ledger rejected request: {0}")]
    Rejected(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn commit_chunk(&self, record: &ChunkRecord) -> LedgerResult<()>;
    async fn commit_final(&self, record: &FinalRecord) -> LedgerResult<()>;
    async fn get_final(&self, session_id: &SessionId) -> LedgerResult<Option<FinalRecord>>;
    /// Ascending by chunk_index; empty when the session has none.
    async fn get_chunks(&self, session_id: &SessionId) -> LedgerResult<Vec<ChunkRecord>>;
}

/// HTTP client for a REST ledger.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    base_url: String,
    client: Client,
}

impl HttpLedger {
    pub fn new(url: String) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn commit_chunk(&self, record: &ChunkRecord) -> LedgerResult<()> {
        let url = format!("{}/chunks", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LedgerError::Rejected(format!(
                "chunk commit failed: {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn commit_final(&self, record: &FinalRecord) -> LedgerResult<()> {
        let url = format!("{}/finals", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LedgerError::Rejected(format!(
                "final commit failed: {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn get_final(&self, session_id: &SessionId) -> LedgerResult<Option<FinalRecord>> {
        let url = format!("{}/finals/{}", self.base_url, session_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(LedgerError::Rejected(format!(
                "final lookup failed: {}",
                resp.status()
            )));
        }

        let record = resp
            .json()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;
        Ok(Some(record))
    }

    async fn get_chunks(&self, session_id: &SessionId) -> LedgerResult<Vec<ChunkRecord>> {
        let url = format!("{}/chunks/{}", self.base_url, session_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LedgerError::Rejected(format!(
                "chunk lookup failed: {}",
                resp.status()
            )));
        }

        let mut records: Vec<ChunkRecord> = resp
            .json()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;
        records.sort_by_key(|r| r.chunk_index);
        Ok(records)
    }
}

#[derive(Default)]
struct MemoryState {
    chunks: HashMap<SessionId, BTreeMap<u64, ChunkRecord>>,
    finals: HashMap<SessionId, FinalRecord>,
}

/// In-process ledger with an online/offline switch. Backs tests and local
/// runs without a remote.
pub struct MemoryLedger {
    online: AtomicBool,
    commit_calls: AtomicUsize,
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            commit_calls: AtomicUsize::new(0),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Simulate connectivity loss or restoration.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Successful commits observed, chunk and final alike.
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn chunk_count(&self, session_id: &SessionId) -> usize {
        let state = self.state.lock().unwrap();
        state.chunks.get(session_id).map(|m| m.len()).unwrap_or(0)
    }

    pub fn final_digest(&self, session_id: &SessionId) -> Option<Digest> {
        let state = self.state.lock().unwrap();
        state.finals.get(session_id).map(|r| r.digest)
    }

    fn check_online(&self) -> LedgerResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Network("offline".to_string()))
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn commit_chunk(&self, record: &ChunkRecord) -> LedgerResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        state
            .chunks
            .entry(record.session_id.clone())
            .or_default()
            .insert(record.chunk_index, record.clone());
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit_final(&self, record: &FinalRecord) -> LedgerResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        state.finals.insert(record.session_id.clone(), record.clone());
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_final(&self, session_id: &SessionId) -> LedgerResult<Option<FinalRecord>> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        Ok(state.finals.get(session_id).cloned())
    }

    async fn get_chunks(&self, session_id: &SessionId) -> LedgerResult<Vec<ChunkRecord>> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .chunks
            .get(session_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }
}
