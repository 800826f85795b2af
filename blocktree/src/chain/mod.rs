//! Chain bookkeeping engine and related abstractions.
//!
//! This module provides a modular, testable acceptance layer consisting of:
//!
//! - per-network parameters ([`params::NetworkParams`]),
//! - the compact-difficulty codec ([`difficulty`]),
//! - the chain-store and orphan-pool abstractions ([`store`]),
//! - and the header acceptance pipeline ([`tree::BlockTree`]).

pub mod difficulty;
pub mod error;
pub mod params;
pub mod store;
pub mod tree;

pub use error::{ChainError, InsertError, StoreError};
pub use params::NetworkParams;
pub use store::{ChainBlock, ChainStore, GENESIS_PARENT_ID, OrphanBlock, OrphanPool};
pub use tree::{BlockTree, InsertionOutcome};
