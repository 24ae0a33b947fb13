//! Crate-wide error taxonomy. One variant per failure kind the store can
//! surface; every fallible operation in the workspace returns `Result<T>`.

use thiserror::Error;

use crate::PageId;

#[derive(Debug, Error)]
pub enum StoreError {
    /// `Get` found no entry for the requested key. A normal outcome, not
    /// a defect; callers match on it like any other `Result` variant.
    #[error("key not found")]
    NotFound,

    #[error("store already exists in this directory")]
    AlreadyExists,

    #[error("no store exists in this directory")]
    NoSuchStore,

    #[error("directory does not exist")]
    NoSuchDirectory,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corrupted page {page_id}: {reason}")]
    Corruption { page_id: PageId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal invariant broken: {0}")]
    InvariantBroken(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
