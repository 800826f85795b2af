//! Header acceptance pipeline and orphan resolution.
//!
//! [`BlockTree`] wires the difficulty codec, the chain store, and the
//! orphan pool into the insertion state machine: an incoming header is
//! classified as duplicate, orphan, or chainable, and a successful chain
//! insertion triggers a cascading promotion of every orphan that was
//! (directly or transitively) waiting on the new block.

use std::collections::VecDeque;

use crate::types::{BlockHash, BlockHeader};

use super::difficulty;
use super::error::{ChainError, InsertError, StoreError};
use super::params::NetworkParams;
use super::store::{ChainBlock, ChainStore, OrphanBlock, OrphanPool};

/// Terminal classification of one accepted header.
///
/// Hard failures (storage faults, malformed difficulty targets) are not
/// outcomes; they surface as the `Err` arm of [`BlockTree::accept`].
#[derive(Clone, Debug, PartialEq)]
pub enum InsertionOutcome {
    /// The header extended a known block and was appended to the chain
    /// store, possibly unlocking buffered orphans.
    Chained {
        /// The newly appended chain row.
        block: ChainBlock,
        /// Orphans the cascade promoted into the chain store as a
        /// direct or transitive consequence of this insert.
        promoted_orphans: u64,
    },
    /// The header's parent is unknown; it was buffered in the orphan
    /// pool until the parent arrives.
    Orphaned(OrphanBlock),
    /// The hash was already recorded, in either table. No effect.
    Duplicate,
}

/// A node's local view of the block tree.
///
/// Generic over the storage backend `S`, which provides both tables.
/// All mutation goes through `&mut self`, so one `BlockTree` value is a
/// single logical writer; share it behind a mutex when several tasks
/// submit headers.
pub struct BlockTree<S> {
    params: NetworkParams,
    store: S,
}

impl<S> BlockTree<S>
where
    S: ChainStore + OrphanPool,
{
    /// Opens a block tree over `store`, seeding the network's genesis
    /// row if it is not already present.
    ///
    /// Seeding bypasses the acceptance pipeline (genesis has no parent
    /// to check) and is idempotent, so repeated opens of the same
    /// persisted store are safe.
    pub fn open(params: NetworkParams, store: S) -> Result<Self, ChainError> {
        let genesis_hash = params.genesis_hash();
        let own_log_difficulty =
            difficulty::log_difficulty(params.genesis_header.bits, params.difficulty_1_bits)?;

        let mut tree = Self { params, store };
        tree.store.insert_genesis(&genesis_hash, own_log_difficulty)?;
        Ok(tree)
    }

    /// The network parameters this tree was opened with.
    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the tree and returns the underlying store.
    ///
    /// Mainly useful for tests and tooling that reopen the same backend.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Accepts one header into the tree.
    ///
    /// The header's identity is the double SHA-256 of its canonical
    /// serialization. A malformed difficulty target is rejected before
    /// any store mutation. The returned outcome is terminal; duplicates
    /// and orphans are not retried here (orphans are retried implicitly
    /// when their parent is later chained).
    pub fn accept(&mut self, header: &BlockHeader) -> Result<InsertionOutcome, ChainError> {
        let hash = header.compute_hash();
        let own_log_difficulty =
            difficulty::log_difficulty(header.bits, self.params.difficulty_1_bits)?;

        if self.store.contains_block(&hash)? {
            return Ok(InsertionOutcome::Duplicate);
        }

        if !self.store.contains_block(&header.previous_block_hash)? {
            return self.buffer_orphan(&hash, &header.previous_block_hash, own_log_difficulty);
        }

        match self
            .store
            .insert_child(&hash, &header.previous_block_hash, own_log_difficulty)
        {
            Ok(block) => {
                let promoted_orphans = self.resolve_orphans(hash)?;
                Ok(InsertionOutcome::Chained { block, promoted_orphans })
            }
            // Lost a race against an identical insert; the uniqueness
            // constraint reported it, so classify as a duplicate.
            Err(InsertError::AlreadyExists) => Ok(InsertionOutcome::Duplicate),
            // Parent vanished between the membership check and the
            // insert; fall back to the orphan path.
            Err(InsertError::UnknownParent) => {
                self.buffer_orphan(&hash, &header.previous_block_hash, own_log_difficulty)
            }
            Err(InsertError::Fault(e)) => Err(ChainError::Store(e)),
        }
    }

    fn buffer_orphan(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<InsertionOutcome, ChainError> {
        match self.store.insert_orphan(hash, parent_hash, own_log_difficulty) {
            Ok(orphan) => Ok(InsertionOutcome::Orphaned(orphan)),
            Err(InsertError::AlreadyExists) => Ok(InsertionOutcome::Duplicate),
            // Orphan inserts never check parents.
            Err(InsertError::UnknownParent) => Err(ChainError::Store(StoreError::Corrupted(
                "orphan pool reported an unknown parent",
            ))),
            Err(InsertError::Fault(e)) => Err(ChainError::Store(e)),
        }
    }

    /// Promotes every orphan transitively waiting on `newly_chained`.
    ///
    /// Blocks arrive in arbitrary order, and an orphan can itself be the
    /// missing parent of other buffered orphans, so one promotion must
    /// unlock the whole buffered subtree in a single pass. The traversal
    /// uses an explicit work-list instead of self-recursion; its depth is
    /// bounded only by the number of buffered orphans, which would
    /// otherwise exhaust the call stack. Returns the number of promoted
    /// orphans.
    fn resolve_orphans(&mut self, newly_chained: BlockHash) -> Result<u64, ChainError> {
        let mut pending = VecDeque::new();
        pending.push_back(newly_chained);

        let mut promoted = 0u64;
        while let Some(parent_hash) = pending.pop_front() {
            for orphan in self.store.orphans_awaiting(&parent_hash)? {
                match self.store.insert_child(
                    &orphan.hash,
                    &orphan.previous_block_hash,
                    orphan.log_difficulty,
                ) {
                    Ok(_) => {
                        self.store.remove_orphan(orphan.id)?;
                        // The promoted block may itself be an awaited
                        // parent.
                        pending.push_back(orphan.hash);
                        promoted += 1;
                    }
                    // Leave the row untouched; it stays buffered.
                    Err(InsertError::AlreadyExists) | Err(InsertError::UnknownParent) => {}
                    Err(InsertError::Fault(e)) => return Err(ChainError::Store(e)),
                }
            }
        }
        Ok(promoted)
    }

    /// Point lookup in the chain store.
    pub fn block(&self, hash: &BlockHash) -> Result<Option<ChainBlock>, ChainError> {
        Ok(self.store.block(hash)?)
    }

    /// Point lookup in the orphan pool.
    pub fn orphan(&self, hash: &BlockHash) -> Result<Option<OrphanBlock>, ChainError> {
        Ok(self.store.orphan(hash)?)
    }

    /// The head of the locally-preferred chain: greatest height,
    /// tie-broken by greatest cumulative log-difficulty. Recomputed from
    /// the store on every call, never cached.
    pub fn best_tip(&self) -> Result<Option<ChainBlock>, ChainError> {
        Ok(self.store.best_tip()?)
    }

    /// Height of a stored block, or `None` when the hash is unknown.
    pub fn height_of(&self, hash: &BlockHash) -> Result<Option<u64>, ChainError> {
        Ok(self.store.block(hash)?.map(|b| b.height))
    }

    /// Cumulative log-difficulty of a stored block, or `None` when the
    /// hash is unknown.
    pub fn cumulative_log_difficulty_of(
        &self,
        hash: &BlockHash,
    ) -> Result<Option<f64>, ChainError> {
        Ok(self.store.block(hash)?.map(|b| b.cumulative_log_difficulty))
    }

    /// Number of currently buffered orphans.
    pub fn orphan_count(&self) -> Result<u64, ChainError> {
        Ok(self.store.orphan_count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mem::InMemoryStore;
    use crate::types::{CompactTarget, Hash256};

    fn tree() -> BlockTree<InMemoryStore> {
        BlockTree::open(NetworkParams::testnet(), InMemoryStore::new()).expect("open tree")
    }

    /// Builds a header on the given parent; `seed` varies the merkle
    /// root so sibling headers get distinct hashes.
    fn child_header(parent: BlockHash, seed: u32, bits: CompactTarget) -> BlockHeader {
        BlockHeader {
            version: 1,
            previous_block_hash: parent,
            merkle_root: Hash256::compute(&seed.to_le_bytes()),
            timestamp: 1_296_688_602 + seed,
            bits,
            nonce: seed,
        }
    }

    fn easiest_bits() -> CompactTarget {
        CompactTarget(0x1d00ffff)
    }

    #[test]
    fn child_of_genesis_chains_with_derived_height_and_work() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();
        let header = child_header(genesis, 1, CompactTarget(0x1c00ffff));

        let outcome = tree.accept(&header).expect("accept");
        let block = match outcome {
            InsertionOutcome::Chained { block, promoted_orphans } => {
                // Nothing was buffered, so the cascade finds no work.
                assert_eq!(promoted_orphans, 0);
                block
            }
            other => panic!("expected Chained, got {other:?}"),
        };

        assert_eq!(block.height, 1);
        // Genesis contributes 0 at difficulty-1 bits; the child's own
        // contribution is one exponent step, ln(256).
        assert!((block.cumulative_log_difficulty - 256f64.ln()).abs() < 1e-9);

        let genesis_row = tree.block(&genesis).expect("lookup").expect("genesis stored");
        assert!(genesis_row.is_genesis());
        assert_eq!(block.previous_block, genesis_row.id);
    }

    #[test]
    fn accepting_the_same_header_twice_is_a_duplicate() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();
        let header = child_header(genesis, 1, easiest_bits());
        let hash = header.compute_hash();

        assert!(matches!(
            tree.accept(&header).expect("first accept"),
            InsertionOutcome::Chained { .. }
        ));
        let stored = tree.block(&hash).expect("lookup").expect("stored");

        assert_eq!(tree.accept(&header).expect("second accept"), InsertionOutcome::Duplicate);
        // No change to the stored row.
        assert_eq!(tree.block(&hash).expect("lookup").expect("stored"), stored);
    }

    #[test]
    fn resubmitting_a_buffered_orphan_is_a_duplicate() {
        let mut tree = tree();
        let header = child_header(BlockHash(Hash256([9u8; 32])), 1, easiest_bits());

        assert!(matches!(
            tree.accept(&header).expect("accept"),
            InsertionOutcome::Orphaned(_)
        ));
        assert_eq!(tree.accept(&header).expect("accept"), InsertionOutcome::Duplicate);
    }

    #[test]
    fn orphan_is_promoted_when_its_parent_arrives() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();

        let h2 = child_header(genesis, 2, easiest_bits());
        let h3 = child_header(h2.compute_hash(), 3, easiest_bits());

        // h3 first: parent unknown, buffered.
        assert!(matches!(
            tree.accept(&h3).expect("accept h3"),
            InsertionOutcome::Orphaned(_)
        ));

        // h2 arrives: chained, and the cascade promotes h3.
        assert!(matches!(
            tree.accept(&h2).expect("accept h2"),
            InsertionOutcome::Chained { promoted_orphans: 1, .. }
        ));

        let h3_row = tree
            .block(&h3.compute_hash())
            .expect("lookup")
            .expect("h3 promoted to chain store");
        assert_eq!(h3_row.height, 2);
        assert!(tree.orphan(&h3.compute_hash()).expect("lookup").is_none());
        assert_eq!(tree.orphan_count().expect("count"), 0);
    }

    #[test]
    fn deep_reverse_order_cascade_promotes_all_orphans_in_one_accept() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();

        // Build a chain of 8 descendants of genesis.
        let mut headers = Vec::new();
        let mut parent = genesis;
        for seed in 1..=8u32 {
            let header = child_header(parent, seed, easiest_bits());
            parent = header.compute_hash();
            headers.push(header);
        }

        // Insert all but the first, in strictly reverse order.
        for header in headers[1..].iter().rev() {
            assert!(matches!(
                tree.accept(header).expect("accept"),
                InsertionOutcome::Orphaned(_)
            ));
        }
        assert_eq!(tree.orphan_count().expect("count"), 7);

        // The common ancestor arrives and unlocks the whole chain; the
        // outcome reports every promotion the cascade performed.
        assert!(matches!(
            tree.accept(&headers[0]).expect("accept ancestor"),
            InsertionOutcome::Chained { promoted_orphans: 7, .. }
        ));

        for (i, header) in headers.iter().enumerate() {
            let row = tree
                .block(&header.compute_hash())
                .expect("lookup")
                .expect("promoted");
            assert_eq!(row.height, i as u64 + 1);
        }
        assert_eq!(tree.orphan_count().expect("count"), 0);

        let tip = tree.best_tip().expect("query").expect("nonempty");
        assert_eq!(tip.height, 8);
        assert_eq!(tip.hash, headers[7].compute_hash());
    }

    #[test]
    fn forks_coexist_and_the_heavier_branch_wins_the_tie() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();

        // Two children of genesis at the same height, one mined against
        // a 256x harder target.
        let light = child_header(genesis, 1, CompactTarget(0x1d00ffff));
        let heavy = child_header(genesis, 2, CompactTarget(0x1c00ffff));

        assert!(matches!(
            tree.accept(&light).expect("accept"),
            InsertionOutcome::Chained { .. }
        ));
        assert!(matches!(
            tree.accept(&heavy).expect("accept"),
            InsertionOutcome::Chained { .. }
        ));

        // Both rows coexist.
        assert!(tree.block(&light.compute_hash()).expect("lookup").is_some());
        assert!(tree.block(&heavy.compute_hash()).expect("lookup").is_some());

        let tip = tree.best_tip().expect("query").expect("nonempty");
        assert_eq!(tip.hash, heavy.compute_hash());

        // A longer branch on the lighter fork takes over: height beats
        // cumulative difficulty.
        let extension = child_header(light.compute_hash(), 3, CompactTarget(0x1d00ffff));
        tree.accept(&extension).expect("accept");
        let tip = tree.best_tip().expect("query").expect("nonempty");
        assert_eq!(tip.hash, extension.compute_hash());
        assert_eq!(tip.height, 2);
    }

    #[test]
    fn cumulative_log_difficulty_grows_linearly_at_constant_target() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();
        let bits = CompactTarget(0x1c00ffff);
        let step = 256f64.ln();

        let mut parent = genesis;
        let mut previous_cumulative = 0.0;
        for seed in 1..=6u32 {
            let header = child_header(parent, seed, bits);
            parent = header.compute_hash();
            let block = match tree.accept(&header).expect("accept") {
                InsertionOutcome::Chained { block, .. } => block,
                other => panic!("expected Chained, got {other:?}"),
            };

            let delta = block.cumulative_log_difficulty - previous_cumulative;
            assert!((delta - step).abs() < 1e-9);
            previous_cumulative = block.cumulative_log_difficulty;
        }
    }

    #[test]
    fn reopening_does_not_disturb_the_genesis_row() {
        let params = NetworkParams::testnet();
        let genesis_hash = params.genesis_hash();

        let tree = BlockTree::open(params, InMemoryStore::new()).expect("first open");
        let first_row = tree.block(&genesis_hash).expect("lookup").expect("seeded");

        // Reopen over the same backend: the second seed is a no-op.
        let tree = BlockTree::open(params, tree.into_store()).expect("second open");
        let second_row = tree.block(&genesis_hash).expect("lookup").expect("still seeded");
        assert_eq!(first_row, second_row);
    }

    #[test]
    fn invalid_target_is_rejected_before_any_store_mutation() {
        let mut tree = tree();
        let genesis = tree.params().genesis_hash();
        let header = child_header(genesis, 1, CompactTarget(0x1d000000));
        let hash = header.compute_hash();

        let err = tree.accept(&header).unwrap_err();
        assert!(matches!(err, ChainError::InvalidTarget(_)));
        assert!(tree.block(&hash).expect("lookup").is_none());
        assert!(tree.orphan(&hash).expect("lookup").is_none());
    }

    #[test]
    fn queries_return_absence_for_unknown_hashes() {
        let tree = tree();
        let unknown = BlockHash(Hash256([0x55; 32]));

        assert!(tree.block(&unknown).expect("lookup").is_none());
        assert!(tree.height_of(&unknown).expect("lookup").is_none());
        assert!(
            tree.cumulative_log_difficulty_of(&unknown)
                .expect("lookup")
                .is_none()
        );
    }
}
