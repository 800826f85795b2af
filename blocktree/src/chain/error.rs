use std::fmt;

use crate::types::CompactTarget;

/// Storage-level error type.
///
/// These are faults of the persistence layer itself, distinct from the
/// expected insertion outcomes ([`InsertError::AlreadyExists`] and
/// [`InsertError::UnknownParent`]).
#[derive(Debug)]
pub enum StoreError {
    /// Underlying RocksDB error.
    RocksDb(rocksdb::Error),
    /// Required column family was not found.
    MissingColumnFamily(&'static str),
    /// Corrupted or malformed stored data (e.g. an index entry pointing
    /// at a missing row, or a key with the wrong length).
    Corrupted(&'static str),
    /// A stored value failed to decode.
    Codec(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::RocksDb(e)
    }
}

/// Error type returned by store insertions.
///
/// `AlreadyExists` and `UnknownParent` are normal classifications the
/// acceptance pipeline turns into `Duplicate` / `Orphaned` outcomes;
/// only `Fault` is a hard failure.
#[derive(Debug)]
pub enum InsertError {
    /// The hash is already recorded in the table.
    AlreadyExists,
    /// The parent hash does not resolve to a stored chain block.
    UnknownParent,
    /// Underlying storage fault.
    Fault(StoreError),
}

impl From<StoreError> for InsertError {
    fn from(e: StoreError) -> Self {
        InsertError::Fault(e)
    }
}

/// High-level errors surfaced by the block tree.
///
/// Expected outcomes (duplicate, orphaned, chained) are returned as
/// values, never as errors; this type covers only hard rejections.
#[derive(Debug)]
pub enum ChainError {
    /// Malformed compact difficulty encoding (zero or negative mantissa).
    /// Rejected before any store mutation.
    InvalidTarget(CompactTarget),
    /// Underlying storage fault.
    Store(StoreError),
}

impl From<StoreError> for ChainError {
    fn from(e: StoreError) -> Self {
        ChainError::Store(e)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::RocksDb(e) => write!(f, "rocksdb error: {e}"),
            StoreError::MissingColumnFamily(cf) => {
                write!(f, "missing column family: {cf}")
            }
            StoreError::Corrupted(msg) => write!(f, "corrupted store: {msg}"),
            StoreError::Codec(msg) => write!(f, "codec error: {msg}"),
        }
    }
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::AlreadyExists => write!(f, "hash already recorded"),
            InsertError::UnknownParent => write!(f, "parent hash not in chain store"),
            InsertError::Fault(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::InvalidTarget(bits) => {
                write!(f, "invalid compact difficulty target: {:#010x}", bits.to_bits())
            }
            ChainError::Store(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
impl std::error::Error for InsertError {}
impl std::error::Error for ChainError {}
