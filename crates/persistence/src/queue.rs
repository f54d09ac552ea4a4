//! Durable pending-write queue.
//!
//! A single append-log file holds every ledger write that has not yet been
//! confirmed remotely: record frames carry the payload, tombstone frames
//! mark a confirmed id. An in-memory index over the live entries is rebuilt
//! by replaying the log on open. Frames are CRC64-checksummed and fsynced,
//! so a torn append is detected and dropped on the next open rather than
//! poisoning the log.

use crate::error::{PersistenceError, Result};
use crc64fast::Digest as Crc64;
use provena_core::LedgerWrite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

const LOG_VERSION: u8 = 1;

const KIND_RECORD: u8 = 1;
const KIND_TOMBSTONE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameHeader {
    local_id: u64,
    kind: u8,
    payload_len: u32,
    checksum: u64,
}

impl FrameHeader {
    const SIZE: usize = 8 + 1 + 4 + 8; // 21 bytes

    fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; Self::SIZE];
        reader.read_exact(&mut buf)?;

        let local_id = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let kind = buf[8];
        let payload_len = u32::from_le_bytes(buf[9..13].try_into().unwrap());
        let checksum = u64::from_le_bytes(buf[13..21].try_into().unwrap());

        Ok(Self {
            local_id,
            kind,
            payload_len,
            checksum,
        })
    }

    fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.local_id.to_le_bytes());
        buf[8] = self.kind;
        buf[9..13].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[13..21].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }
}

fn frame_checksum(local_id: u64, kind: u8, payload: &[u8]) -> u64 {
    let mut digest = Crc64::new();
    digest.write(&local_id.to_le_bytes());
    digest.write(&[kind]);
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

/// On-disk payload of a record frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredRecord {
    payload: LedgerWrite,
    enqueued_at: u64,
}

/// A ledger write that has not yet been confirmed remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub local_id: u64,
    pub payload: LedgerWrite,
    pub enqueued_at: u64,
}

/// Crash-tolerant store of ledger writes awaiting remote confirmation.
#[derive(Debug)]
pub struct PendingQueue {
    path: PathBuf,
    file: File,
    live: BTreeMap<u64, StoredRecord>,
    next_id: u64,
    truncated: Option<u64>,
}

impl PendingQueue {
    /// Open or create the queue log, replaying it into the in-memory index.
    ///
    /// A torn or corrupt tail is truncated away so a crash mid-append cannot
    /// fail the open; the dropped byte count is reported via
    /// [`PendingQueue::truncated_bytes`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(&[LOG_VERSION])?;
            file.sync_data()?;
            return Ok(Self {
                path,
                file,
                live: BTreeMap::new(),
                next_id: 1,
                truncated: None,
            });
        }

        let mut reader = BufReader::new(File::open(&path)?);
        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != LOG_VERSION {
            return Err(PersistenceError::UnsupportedVersion(version[0]));
        }

        let mut live = BTreeMap::new();
        let mut next_id = 1u64;
        let mut good_end = 1u64;

        'replay: loop {
            match read_frame(&mut reader) {
                Ok(None) => break 'replay,
                Ok(Some((header, payload))) => {
                    match header.kind {
                        KIND_RECORD => {
                            let decoded = bincode::serde::decode_from_slice::<StoredRecord, _>(
                                &payload,
                                bincode::config::standard(),
                            );
                            match decoded {
                                Ok((stored, _)) => {
                                    live.insert(header.local_id, stored);
                                }
                                // Undecodable payload: treat everything from
                                // here on as corrupt.
                                Err(_) => break 'replay,
                            }
                        }
                        KIND_TOMBSTONE => {
                            live.remove(&header.local_id);
                        }
                        _ => break 'replay,
                    }
                    next_id = next_id.max(header.local_id + 1);
                    good_end += (FrameHeader::SIZE + payload.len()) as u64;
                }
                Err(_) => break 'replay,
            }
        }

        let dropped = len.saturating_sub(good_end);
        let truncated = if dropped > 0 {
            file.set_len(good_end)?;
            file.sync_data()?;
            Some(dropped)
        } else {
            None
        };

        Ok(Self {
            path,
            file,
            live,
            next_id,
            truncated,
        })
    }

    /// Append a write and fsync. Returns the assigned local id.
    ///
    /// Ids ascend in enqueue order. The append is atomic in the crash sense:
    /// a torn frame fails its checksum and is dropped wholesale on the next
    /// open.
    pub fn enqueue(&mut self, payload: LedgerWrite) -> Result<u64> {
        let local_id = self.next_id;
        let stored = StoredRecord {
            payload,
            enqueued_at: unix_now(),
        };
        let encoded = bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        self.append_frame(local_id, KIND_RECORD, &encoded)?;
        self.next_id += 1;
        self.live.insert(local_id, stored);
        Ok(local_id)
    }

    /// All pending writes in ascending local-id order.
    pub fn list_all(&self) -> Vec<PendingWrite> {
        self.live
            .iter()
            .map(|(id, stored)| PendingWrite {
                local_id: *id,
                payload: stored.payload.clone(),
                enqueued_at: stored.enqueued_at,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Confirm a write: append a tombstone and drop it from the index.
    ///
    /// Removing an id that is not present is a no-op, not an error. When the
    /// last live entry goes the log is compacted back to its header.
    pub fn remove(&mut self, local_id: u64) -> Result<()> {
        if !self.live.contains_key(&local_id) {
            return Ok(());
        }

        self.append_frame(local_id, KIND_TOMBSTONE, &[])?;
        self.live.remove(&local_id);

        if self.live.is_empty() {
            self.file.set_len(1)?;
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Bytes dropped from a torn or corrupt tail during open, if any.
    pub fn truncated_bytes(&self) -> Option<u64> {
        self.truncated
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_frame(&mut self, local_id: u64, kind: u8, payload: &[u8]) -> Result<()> {
        let checksum = frame_checksum(local_id, kind, payload);
        let header = FrameHeader {
            local_id,
            kind,
            payload_len: payload.len() as u32,
            checksum,
        };

        self.file.write_all(&header.to_bytes())?;
        self.file.write_all(payload)?;
        self.file.sync_data()?;
        Ok(())
    }
}

fn read_frame<R: Read>(reader: &mut R) -> Result<Option<(FrameHeader, Vec<u8>)>> {
    let header = match FrameHeader::read_from(&mut *reader) {
        Ok(h) => h,
        Err(PersistenceError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Ok(None)
        }
        Err(e) => return Err(e),
    };

    let mut payload = vec![0u8; header.payload_len as usize];
    reader.read_exact(&mut payload)?;

    let sum = frame_checksum(header.local_id, header.kind, &payload);
    if sum != header.checksum {
        return Err(PersistenceError::ChecksumMismatch {
            expected: header.checksum,
            found: sum,
        });
    }

    Ok(Some((header, payload)))
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
