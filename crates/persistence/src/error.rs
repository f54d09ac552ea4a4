use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("unsupported queue log version {0}")]
    UnsupportedVersion(u8),
    #[error("checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: u64, found: u64 },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid data format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
