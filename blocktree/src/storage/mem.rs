//! In-memory store.
//!
//! This implementation is useful for unit tests, benchmarks, and small
//! simulations. It keeps both tables in `HashMap`s keyed by hash; the
//! best tip is found by a full scan, which is fine at test scale.

use std::collections::HashMap;

use crate::chain::error::{InsertError, StoreError};
use crate::chain::store::{
    ChainBlock, ChainStore, GENESIS_PARENT_ID, OrphanBlock, OrphanPool, tip_ordering,
};
use crate::types::BlockHash;

/// In-memory implementation of [`ChainStore`] and [`OrphanPool`].
#[derive(Default)]
pub struct InMemoryStore {
    chain: HashMap<BlockHash, ChainBlock>,
    orphans: HashMap<BlockHash, OrphanBlock>,
    orphan_ids: HashMap<u64, BlockHash>,
    last_chain_id: u64,
    last_orphan_id: u64,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of chain blocks currently stored.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    /// Returns `true` if no chain blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl ChainStore for InMemoryStore {
    fn block(&self, hash: &BlockHash) -> Result<Option<ChainBlock>, StoreError> {
        Ok(self.chain.get(hash).copied())
    }

    fn contains_block(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.chain.contains_key(hash))
    }

    fn best_tip(&self) -> Result<Option<ChainBlock>, StoreError> {
        Ok(self
            .chain
            .values()
            .max_by(|a, b| tip_ordering(a, b))
            .copied())
    }

    fn insert_child(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<ChainBlock, InsertError> {
        if self.chain.contains_key(hash) {
            return Err(InsertError::AlreadyExists);
        }
        let parent = self
            .chain
            .get(parent_hash)
            .copied()
            .ok_or(InsertError::UnknownParent)?;

        self.last_chain_id += 1;
        let block = ChainBlock {
            id: self.last_chain_id,
            hash: *hash,
            height: parent.height + 1,
            cumulative_log_difficulty: parent.cumulative_log_difficulty + own_log_difficulty,
            previous_block: parent.id,
        };
        self.chain.insert(*hash, block);
        Ok(block)
    }

    fn insert_genesis(
        &mut self,
        hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<Option<ChainBlock>, StoreError> {
        if self.chain.contains_key(hash) {
            return Ok(None);
        }

        self.last_chain_id += 1;
        let block = ChainBlock {
            id: self.last_chain_id,
            hash: *hash,
            height: 0,
            cumulative_log_difficulty: own_log_difficulty,
            previous_block: GENESIS_PARENT_ID,
        };
        self.chain.insert(*hash, block);
        Ok(Some(block))
    }
}

impl OrphanPool for InMemoryStore {
    fn orphan(&self, hash: &BlockHash) -> Result<Option<OrphanBlock>, StoreError> {
        Ok(self.orphans.get(hash).copied())
    }

    fn contains_orphan(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.orphans.contains_key(hash))
    }

    fn orphans_awaiting(
        &self,
        parent_hash: &BlockHash,
    ) -> Result<Vec<OrphanBlock>, StoreError> {
        Ok(self
            .orphans
            .values()
            .filter(|o| o.previous_block_hash == *parent_hash)
            .copied()
            .collect())
    }

    fn insert_orphan(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<OrphanBlock, InsertError> {
        if self.orphans.contains_key(hash) {
            return Err(InsertError::AlreadyExists);
        }

        self.last_orphan_id += 1;
        let orphan = OrphanBlock {
            id: self.last_orphan_id,
            hash: *hash,
            previous_block_hash: *parent_hash,
            log_difficulty: own_log_difficulty,
        };
        self.orphans.insert(*hash, orphan);
        self.orphan_ids.insert(orphan.id, *hash);
        Ok(orphan)
    }

    fn remove_orphan(&mut self, id: u64) -> Result<(), StoreError> {
        if let Some(hash) = self.orphan_ids.remove(&id) {
            self.orphans.remove(&hash);
        }
        Ok(())
    }

    fn orphan_count(&self) -> Result<u64, StoreError> {
        Ok(self.orphans.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HASH_LEN, Hash256};

    fn hash(byte: u8) -> BlockHash {
        BlockHash(Hash256([byte; HASH_LEN]))
    }

    #[test]
    fn genesis_then_children_derive_height_and_work() {
        let mut store = InMemoryStore::new();

        let genesis = store
            .insert_genesis(&hash(0), 1.5)
            .expect("no fault")
            .expect("inserted");
        assert_eq!(genesis.height, 0);
        assert!(genesis.is_genesis());

        let child = store.insert_child(&hash(1), &hash(0), 2.0).expect("chainable");
        assert_eq!(child.height, 1);
        assert_eq!(child.previous_block, genesis.id);
        assert!((child.cumulative_log_difficulty - 3.5).abs() < 1e-12);
    }

    #[test]
    fn duplicate_and_unknown_parent_are_reported() {
        let mut store = InMemoryStore::new();
        store.insert_genesis(&hash(0), 0.0).expect("no fault");

        store.insert_child(&hash(1), &hash(0), 1.0).expect("chainable");
        assert!(matches!(
            store.insert_child(&hash(1), &hash(0), 1.0),
            Err(InsertError::AlreadyExists)
        ));
        assert!(matches!(
            store.insert_child(&hash(2), &hash(9), 1.0),
            Err(InsertError::UnknownParent)
        ));
    }

    #[test]
    fn second_genesis_seed_is_a_noop() {
        let mut store = InMemoryStore::new();
        let first = store.insert_genesis(&hash(0), 4.0).expect("no fault");
        assert!(first.is_some());

        let second = store.insert_genesis(&hash(0), 9.0).expect("no fault");
        assert!(second.is_none());

        let row = store.block(&hash(0)).expect("lookup").expect("present");
        assert!((row.cumulative_log_difficulty - 4.0).abs() < 1e-12);
        assert_eq!(store.chain_len(), 1);
    }

    #[test]
    fn best_tip_orders_by_height_then_cumulative_difficulty() {
        let mut store = InMemoryStore::new();
        store.insert_genesis(&hash(0), 0.0).expect("no fault");

        // Two equal-height children with different work.
        store.insert_child(&hash(1), &hash(0), 1.0).expect("chainable");
        store.insert_child(&hash(2), &hash(0), 5.0).expect("chainable");
        let tip = store.best_tip().expect("query").expect("nonempty");
        assert_eq!(tip.hash, hash(2));

        // Height beats work.
        store.insert_child(&hash(3), &hash(1), 0.5).expect("chainable");
        let tip = store.best_tip().expect("query").expect("nonempty");
        assert_eq!(tip.hash, hash(3));
    }

    #[test]
    fn exact_tip_tie_is_broken_by_hash() {
        let mut store = InMemoryStore::new();
        store.insert_genesis(&hash(0), 0.0).expect("no fault");
        store.insert_child(&hash(1), &hash(0), 1.0).expect("chainable");
        store.insert_child(&hash(7), &hash(0), 1.0).expect("chainable");

        let tip = store.best_tip().expect("query").expect("nonempty");
        assert_eq!(tip.hash, hash(7));
    }

    #[test]
    fn orphans_are_indexed_by_missing_parent() {
        let mut store = InMemoryStore::new();

        store.insert_orphan(&hash(1), &hash(9), 1.0).expect("pooled");
        store.insert_orphan(&hash(2), &hash(9), 1.0).expect("pooled");
        store.insert_orphan(&hash(3), &hash(8), 1.0).expect("pooled");

        let awaiting = store.orphans_awaiting(&hash(9)).expect("query");
        assert_eq!(awaiting.len(), 2);
        assert!(awaiting.iter().all(|o| o.previous_block_hash == hash(9)));
        assert_eq!(store.orphan_count().expect("count"), 3);

        assert!(matches!(
            store.insert_orphan(&hash(1), &hash(9), 1.0),
            Err(InsertError::AlreadyExists)
        ));
    }

    #[test]
    fn orphan_removal_is_idempotent() {
        let mut store = InMemoryStore::new();
        let orphan = store.insert_orphan(&hash(1), &hash(9), 1.0).expect("pooled");

        store.remove_orphan(orphan.id).expect("removed");
        assert!(store.orphan(&hash(1)).expect("lookup").is_none());

        // Second removal of the same id is a no-op.
        store.remove_orphan(orphan.id).expect("still ok");
        assert_eq!(store.orphan_count().expect("count"), 0);
    }
}
