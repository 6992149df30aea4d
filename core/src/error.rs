//! Error types for ledger, draw and sync operations
//!
//! Enums instead of String-based errors so rejections can be matched on and
//! shipped across the wasm boundary unchanged.

use alloc::string::String;
use core::fmt;
use parity_scale_codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::types::Points;

/// Errors raised by engine operations
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GachaError {
    /// Balance below the cost of a draw
    InsufficientFunds { have: Points, need: Points },
    /// Login attempted with a blank name
    EmptyName,
    /// Operation needs a logged-in user
    NoActiveSession,
    /// Prize table has no entries
    EmptyPrizeTable,
    /// Two prizes share an id
    DuplicatePrizeId { id: String },
    /// A weight is negative, NaN or infinite
    InvalidWeight { id: String },
    /// A fragment prize names no fragment group
    MissingFragmentGroup { id: String },
    /// A point prize whose value is not a whole, non-negative number
    InvalidPointValue { id: String },
    /// Snapshot bytes could not be decoded
    CorruptSnapshot,
    /// The local store refused a write
    Storage { error: StoreError },
}

impl fmt::Display for GachaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GachaError::InsufficientFunds { have, need } => {
                write!(f, "Not enough points: have {}, need {}", have, need)
            }
            GachaError::EmptyName => write!(f, "Name must not be empty"),
            GachaError::NoActiveSession => write!(f, "No user is logged in"),
            GachaError::EmptyPrizeTable => write!(f, "Prize table is empty"),
            GachaError::DuplicatePrizeId { id } => write!(f, "Duplicate prize id {}", id),
            GachaError::InvalidWeight { id } => write!(f, "Prize {} has an invalid weight", id),
            GachaError::MissingFragmentGroup { id } => {
                write!(f, "Fragment prize {} has no fragment group", id)
            }
            GachaError::InvalidPointValue { id } => {
                write!(f, "Point prize {} must award a whole number of points", id)
            }
            GachaError::CorruptSnapshot => write!(f, "Snapshot could not be decoded"),
            GachaError::Storage { error } => write!(f, "{}", error),
        }
    }
}

impl From<StoreError> for GachaError {
    fn from(e: StoreError) -> Self {
        GachaError::Storage { error: e }
    }
}

/// Local key/value store failures
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreError {
    /// The backend rejected the write (quota, private mode, I/O)
    WriteFailed { key: String, reason: String },
    /// No backend is available at all
    Unavailable,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::WriteFailed { key, reason } => {
                write!(f, "Could not save {}: {}", key, reason)
            }
            StoreError::Unavailable => write!(f, "Local storage is unavailable"),
        }
    }
}

/// Why a pull, push or create against the remote document failed.
/// Never fatal: local state stays the durable record.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncError {
    /// No remote document id has been set
    NotConfigured,
    /// Network error or timeout
    Unreachable { reason: String },
    /// The document id does not exist
    NotFound,
    /// The store answered with a non-success status
    Rejected { status: u16 },
    /// The body was not a sync document
    Malformed,
    /// The provider cannot do this; provision the document manually
    Unsupported,
    /// Synced data arrived but could not be saved locally
    LocalStorage { reason: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NotConfigured => write!(f, "Set a cloud id first"),
            SyncError::Unreachable { reason } => write!(f, "Network unreachable ({})", reason),
            SyncError::NotFound => write!(f, "Cloud id not found (404), check the id"),
            SyncError::Rejected { status } => write!(f, "Server rejected the request ({})", status),
            SyncError::Malformed => write!(f, "Cloud data is malformed"),
            SyncError::Unsupported => {
                write!(f, "This provider cannot create documents, create one manually")
            }
            SyncError::LocalStorage { reason } => write!(f, "Could not save synced data ({})", reason),
        }
    }
}

/// Why an import row was skipped
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TypeInfo, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportIssue {
    /// Name missing or blank after trimming
    EmptyName,
    /// Points missing, non-numeric or negative
    MalformedPoints,
}

/// Non-fatal prize table problems found at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConfigWarning {
    /// Weights do not add up to 100; the gap falls to the first prize,
    /// anything past 100 is unreachable
    WeightSumMismatch { total: f64 },
    /// A prize sits entirely past the 100 mark and can never be drawn
    UnreachablePrize { id: String },
}

#[cfg(feature = "std")]
impl std::error::Error for GachaError {}

#[cfg(feature = "std")]
impl std::error::Error for StoreError {}

#[cfg(feature = "std")]
impl std::error::Error for SyncError {}

/// Result type alias for engine operations
pub type GachaResult<T> = Result<T, GachaError>;

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
