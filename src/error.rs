// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unreadable byte source: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid digest encoding: {0}")]
    InvalidDigest(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
