//! Storage abstraction used by the acceptance pipeline.
//!
//! Two logically paired tables back the block tree:
//!
//! - the **chain store**: one immutable row per accepted block, carrying
//!   the height and cumulative log-difficulty derived from its parent at
//!   insertion time,
//! - the **orphan pool**: one row per block whose parent has not been
//!   seen yet, indexed by the missing parent's hash.
//!
//! All writes take `&mut self`. The acceptance pipeline performs
//! check-then-insert sequences that are not atomic on their own; the
//! exclusive borrow is what serializes them, so two concurrent accepts
//! cannot both observe "absent" and both insert. The hash uniqueness
//! checks inside `insert_*` remain the last line of defense.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::BlockHash;

use super::error::{InsertError, StoreError};

/// Sentinel stored in [`ChainBlock::previous_block`] for the genesis row.
/// Store-assigned ids start at 1, so 0 never collides with a real row.
pub const GENESIS_PARENT_ID: u64 = 0;

/// One accepted block in the chain store.
///
/// Rows are immutable once written: `height` and
/// `cumulative_log_difficulty` are derived from the parent exactly once,
/// at insertion time, and never recomputed. Multiple rows may reference
/// the same parent (forks coexist); no row is ever deleted or rewritten
/// to represent a reorganization, because the best chain is a read-time
/// query rather than a stored flag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainBlock {
    /// Store-assigned identity, stable for the row's lifetime.
    pub id: u64,
    /// The block's identity in the wire protocol; unique in the table.
    pub hash: BlockHash,
    /// Genesis is 0; every other row is its parent's height + 1.
    pub height: u64,
    /// Genesis carries its own log-difficulty; every other row is its
    /// parent's accumulator plus this block's own contribution.
    pub cumulative_log_difficulty: f64,
    /// Store id of the parent row, or [`GENESIS_PARENT_ID`].
    pub previous_block: u64,
}

impl ChainBlock {
    /// Whether this row is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.previous_block == GENESIS_PARENT_ID
    }
}

/// One buffered block awaiting its parent.
///
/// Rows are written once and deleted once, at the moment they are
/// promoted into the chain store; they are never updated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrphanBlock {
    /// Store-assigned identity.
    pub id: u64,
    /// Digest of this block; unique within the pool.
    pub hash: BlockHash,
    /// Digest of the currently absent parent. Not unique: several
    /// orphans may await the same missing parent.
    pub previous_block_hash: BlockHash,
    /// This block's own (non-cumulative) log-difficulty contribution,
    /// computed once at insertion.
    pub log_difficulty: f64,
}

/// Total order used to pick the best tip.
///
/// Height is the primary key and cumulative log-difficulty the
/// tie-break among equal-height branches. A further tie on both fields
/// is broken by the hash bytes so the choice is deterministic for
/// identical store contents. Both storage backends must agree with
/// this ordering (the RocksDB backend encodes it into its index keys).
pub fn tip_ordering(a: &ChainBlock, b: &ChainBlock) -> Ordering {
    a.height
        .cmp(&b.height)
        .then(a.cumulative_log_difficulty.total_cmp(&b.cumulative_log_difficulty))
        .then(a.hash.cmp(&b.hash))
}

/// Persistent table of accepted blocks.
///
/// Implementations must guarantee that a row, once visible to
/// [`ChainStore::block`], survives process restart (the in-memory
/// backend is exempt and exists for tests and simulations).
pub trait ChainStore {
    /// Point lookup by hash.
    fn block(&self, hash: &BlockHash) -> Result<Option<ChainBlock>, StoreError>;

    /// Membership test; used pervasively by the acceptance pipeline.
    fn contains_block(&self, hash: &BlockHash) -> Result<bool, StoreError>;

    /// Returns the row maximizing [`tip_ordering`], or `None` only when
    /// the store is empty (which should not happen once genesis is
    /// seeded).
    fn best_tip(&self) -> Result<Option<ChainBlock>, StoreError>;

    /// Appends a child of an existing row.
    ///
    /// Fails with [`InsertError::AlreadyExists`] if `hash` is already
    /// present and with [`InsertError::UnknownParent`] if `parent_hash`
    /// does not resolve; otherwise derives `height` and the cumulative
    /// accumulator from the parent and returns the new row.
    fn insert_child(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<ChainBlock, InsertError>;

    /// Seeds the genesis row: height 0, accumulator equal to its own
    /// log-difficulty, parent sentinel. Returns `None` (no-op) if the
    /// hash is already present; idempotent across repeated opens.
    fn insert_genesis(
        &mut self,
        hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<Option<ChainBlock>, StoreError>;
}

/// Persistent table of blocks received before their parent.
pub trait OrphanPool {
    /// Point lookup by hash.
    fn orphan(&self, hash: &BlockHash) -> Result<Option<OrphanBlock>, StoreError>;

    /// Membership test.
    fn contains_orphan(&self, hash: &BlockHash) -> Result<bool, StoreError>;

    /// All orphans whose `previous_block_hash` equals `parent_hash`.
    /// Order is unspecified but the result is exhaustive and stable
    /// within one resolution pass.
    fn orphans_awaiting(
        &self,
        parent_hash: &BlockHash,
    ) -> Result<Vec<OrphanBlock>, StoreError>;

    /// Buffers a block. Fails with [`InsertError::AlreadyExists`] if
    /// `hash` is already pooled. Callers are responsible for checking
    /// chain-store membership first; no cross-table check happens here.
    fn insert_orphan(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<OrphanBlock, InsertError>;

    /// Deletes a row by id; a no-op if already absent.
    fn remove_orphan(&mut self, id: u64) -> Result<(), StoreError>;

    /// Number of currently buffered orphans (feeds the pool-size gauge).
    fn orphan_count(&self) -> Result<u64, StoreError>;
}
