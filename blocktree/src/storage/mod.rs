//! Storage backends for the block tree.
//!
//! This module provides concrete implementations of the
//! [`crate::chain::store::ChainStore`] and
//! [`crate::chain::store::OrphanPool`] traits, including:
//!
//! - an in-memory store ([`mem::InMemoryStore`]) suitable for tests,
//! - a RocksDB-backed store ([`rocksdb::RocksDbStore`]) for persistent
//!   nodes.

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryStore;
pub use rocksdb::{RocksDbConfig, RocksDbStore};
