//! RocksDB-backed store.
//!
//! This implementation persists both tables in a RocksDB instance with
//! dedicated column families:
//!
//! - `"chain"`:         maps `BlockHash` (32 bytes) -> chain-block row,
//! - `"chain_index"`:   maps `height || cumulative || hash` -> `BlockHash`,
//!                      ordered so the best tip is the last key,
//! - `"orphans"`:       maps `BlockHash` -> orphan row,
//! - `"orphan_parent"`: maps `parent_hash || hash` -> `BlockHash`, so the
//!                      orphans awaiting one parent are a prefix scan,
//! - `"orphan_ids"`:    maps big-endian id -> `BlockHash`,
//! - `"meta"`:          id counters.
//!
//! Every multi-key mutation goes through a single `WriteBatch`, so a
//! crash cannot leave a row without its index entries. Row values are
//! encoded with bincode 2 (`serde` integration, `standard()` config).

use std::{path::Path, sync::Arc};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::chain::error::{InsertError, StoreError};
use crate::chain::store::{
    ChainBlock, ChainStore, GENESIS_PARENT_ID, OrphanBlock, OrphanPool,
};
use crate::types::{BlockHash, HASH_LEN, Hash256};

const CF_CHAIN: &str = "chain";
const CF_CHAIN_INDEX: &str = "chain_index";
const CF_ORPHANS: &str = "orphans";
const CF_ORPHAN_PARENT: &str = "orphan_parent";
const CF_ORPHAN_IDS: &str = "orphan_ids";
const CF_META: &str = "meta";

const KEY_LAST_CHAIN_ID: &[u8] = b"last_chain_id";
const KEY_LAST_ORPHAN_ID: &[u8] = b"last_orphan_id";

/// Configuration for [`RocksDbStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/blocktree-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// Order-preserving big-endian encoding of an `f64`.
///
/// Flipping the sign bit of non-negative values and all bits of negative
/// values makes the byte order match the numeric order, which lets the
/// tip index sort cumulative log-difficulty lexicographically.
fn sortable_f64(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let flipped = if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    };
    flipped.to_be_bytes()
}

/// Key in the `"chain_index"` column family.
///
/// Layout mirrors [`crate::chain::store::tip_ordering`]: height first,
/// cumulative log-difficulty second, hash as the deterministic
/// tie-break. The greatest key is the best tip.
fn chain_index_key(block: &ChainBlock) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[0..8].copy_from_slice(&block.height.to_be_bytes());
    key[8..16].copy_from_slice(&sortable_f64(block.cumulative_log_difficulty));
    key[16..48].copy_from_slice(block.hash.as_bytes());
    key
}

/// Key in the `"orphan_parent"` column family: parent hash, then the
/// orphan's own hash so siblings get distinct keys under one prefix.
fn orphan_parent_key(parent_hash: &BlockHash, hash: &BlockHash) -> [u8; 64] {
    let mut key = [0u8; 64];
    key[0..32].copy_from_slice(parent_hash.as_bytes());
    key[32..64].copy_from_slice(hash.as_bytes());
    key
}

fn decode_hash(bytes: &[u8], context: &'static str) -> Result<BlockHash, StoreError> {
    if bytes.len() != HASH_LEN {
        return Err(StoreError::Corrupted(context));
    }
    let mut arr = [0u8; HASH_LEN];
    arr.copy_from_slice(bytes);
    Ok(BlockHash(Hash256(arr)))
}

/// RocksDB-backed implementation of [`ChainStore`] and [`OrphanPool`].
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Opens (or creates) a RocksDB-backed store at the given path.
    ///
    /// This sets up all column families listed in the module docs. The
    /// `"default"` column family is also created to keep RocksDB happy,
    /// but it is not currently used.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StoreError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(CF_CHAIN, Options::default()),
            ColumnFamilyDescriptor::new(CF_CHAIN_INDEX, Options::default()),
            ColumnFamilyDescriptor::new(CF_ORPHANS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ORPHAN_PARENT, Options::default()),
            ColumnFamilyDescriptor::new(CF_ORPHAN_IDS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self { db })
    }

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or(StoreError::MissingColumnFamily(name))
    }

    fn encode_row<T: Serialize>(row: &T) -> Result<Vec<u8>, StoreError> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(row, cfg).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode_row<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        let cfg = bincode::config::standard();
        let (row, _) = bincode::serde::decode_from_slice(bytes, cfg)
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(row)
    }

    /// Loads a `u64` counter from the meta column family; absent = 0.
    fn load_counter(&self, key: &'static [u8]) -> Result<u64, StoreError> {
        let cf_meta = self.cf(CF_META)?;
        match self.db.get_cf(&cf_meta, key)? {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::Corrupted("meta counter width"))?;
                Ok(u64::from_be_bytes(arr))
            }
        }
    }

    fn get_chain_row(&self, hash: &BlockHash) -> Result<Option<ChainBlock>, StoreError> {
        let cf = self.cf(CF_CHAIN)?;
        match self.db.get_cf(&cf, hash.as_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode_row(&bytes)?)),
        }
    }

    fn get_orphan_row(&self, hash: &BlockHash) -> Result<Option<OrphanBlock>, StoreError> {
        let cf = self.cf(CF_ORPHANS)?;
        match self.db.get_cf(&cf, hash.as_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode_row(&bytes)?)),
        }
    }

    /// Writes a chain row, its tip-index entry, and the advanced id
    /// counter in one batch.
    fn write_chain_row(&mut self, block: &ChainBlock) -> Result<(), StoreError> {
        let cf_chain = self.cf(CF_CHAIN)?;
        let cf_index = self.cf(CF_CHAIN_INDEX)?;
        let cf_meta = self.cf(CF_META)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_chain, block.hash.as_bytes(), Self::encode_row(block)?);
        batch.put_cf(&cf_index, chain_index_key(block), block.hash.as_bytes());
        batch.put_cf(&cf_meta, KEY_LAST_CHAIN_ID, block.id.to_be_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

impl ChainStore for RocksDbStore {
    fn block(&self, hash: &BlockHash) -> Result<Option<ChainBlock>, StoreError> {
        self.get_chain_row(hash)
    }

    fn contains_block(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        let cf = self.cf(CF_CHAIN)?;
        Ok(self.db.get_cf(&cf, hash.as_bytes())?.is_some())
    }

    fn best_tip(&self) -> Result<Option<ChainBlock>, StoreError> {
        let cf_index = self.cf(CF_CHAIN_INDEX)?;

        // The index key embeds (height, cumulative, hash) in sortable
        // form, so the greatest key is the best tip.
        match self.db.iterator_cf(&cf_index, IteratorMode::End).next() {
            None => Ok(None),
            Some(entry) => {
                let (_, value) = entry?;
                let hash = decode_hash(&value, "tip index value width")?;
                self.get_chain_row(&hash)?
                    .map(Some)
                    .ok_or(StoreError::Corrupted("tip index points at missing row"))
            }
        }
    }

    fn insert_child(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<ChainBlock, InsertError> {
        if self.contains_block(hash)? {
            return Err(InsertError::AlreadyExists);
        }
        let parent = self
            .get_chain_row(parent_hash)?
            .ok_or(InsertError::UnknownParent)?;

        let block = ChainBlock {
            id: self.load_counter(KEY_LAST_CHAIN_ID)? + 1,
            hash: *hash,
            height: parent.height + 1,
            cumulative_log_difficulty: parent.cumulative_log_difficulty + own_log_difficulty,
            previous_block: parent.id,
        };
        self.write_chain_row(&block)?;
        Ok(block)
    }

    fn insert_genesis(
        &mut self,
        hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<Option<ChainBlock>, StoreError> {
        if self.contains_block(hash)? {
            return Ok(None);
        }

        let block = ChainBlock {
            id: self.load_counter(KEY_LAST_CHAIN_ID)? + 1,
            hash: *hash,
            height: 0,
            cumulative_log_difficulty: own_log_difficulty,
            previous_block: GENESIS_PARENT_ID,
        };
        self.write_chain_row(&block)?;
        Ok(Some(block))
    }
}

impl OrphanPool for RocksDbStore {
    fn orphan(&self, hash: &BlockHash) -> Result<Option<OrphanBlock>, StoreError> {
        self.get_orphan_row(hash)
    }

    fn contains_orphan(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        let cf = self.cf(CF_ORPHANS)?;
        Ok(self.db.get_cf(&cf, hash.as_bytes())?.is_some())
    }

    fn orphans_awaiting(
        &self,
        parent_hash: &BlockHash,
    ) -> Result<Vec<OrphanBlock>, StoreError> {
        let cf_parent = self.cf(CF_ORPHAN_PARENT)?;

        let mut awaiting = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_parent,
            IteratorMode::From(parent_hash.as_bytes(), Direction::Forward),
        );
        for entry in iter {
            let (key, value) = entry?;
            if !key.starts_with(parent_hash.as_bytes()) {
                break;
            }
            let hash = decode_hash(&value, "orphan parent index value width")?;
            let row = self
                .get_orphan_row(&hash)?
                .ok_or(StoreError::Corrupted("orphan index points at missing row"))?;
            awaiting.push(row);
        }
        Ok(awaiting)
    }

    fn insert_orphan(
        &mut self,
        hash: &BlockHash,
        parent_hash: &BlockHash,
        own_log_difficulty: f64,
    ) -> Result<OrphanBlock, InsertError> {
        if self.contains_orphan(hash)? {
            return Err(InsertError::AlreadyExists);
        }

        let orphan = OrphanBlock {
            id: self.load_counter(KEY_LAST_ORPHAN_ID)? + 1,
            hash: *hash,
            previous_block_hash: *parent_hash,
            log_difficulty: own_log_difficulty,
        };

        let cf_orphans = self.cf(CF_ORPHANS)?;
        let cf_parent = self.cf(CF_ORPHAN_PARENT)?;
        let cf_ids = self.cf(CF_ORPHAN_IDS)?;
        let cf_meta = self.cf(CF_META)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_orphans, hash.as_bytes(), Self::encode_row(&orphan)?);
        batch.put_cf(
            &cf_parent,
            orphan_parent_key(parent_hash, hash),
            hash.as_bytes(),
        );
        batch.put_cf(&cf_ids, orphan.id.to_be_bytes(), hash.as_bytes());
        batch.put_cf(&cf_meta, KEY_LAST_ORPHAN_ID, orphan.id.to_be_bytes());
        self.db.write(batch).map_err(StoreError::from)?;

        Ok(orphan)
    }

    fn remove_orphan(&mut self, id: u64) -> Result<(), StoreError> {
        let cf_ids = self.cf(CF_ORPHAN_IDS)?;

        let hash = match self.db.get_cf(&cf_ids, id.to_be_bytes())? {
            None => return Ok(()),
            Some(bytes) => decode_hash(&bytes, "orphan id index value width")?,
        };
        let orphan = self
            .get_orphan_row(&hash)?
            .ok_or(StoreError::Corrupted("orphan id index points at missing row"))?;

        let cf_orphans = self.cf(CF_ORPHANS)?;
        let cf_parent = self.cf(CF_ORPHAN_PARENT)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_orphans, hash.as_bytes());
        batch.delete_cf(
            &cf_parent,
            orphan_parent_key(&orphan.previous_block_hash, &hash),
        );
        batch.delete_cf(&cf_ids, id.to_be_bytes());
        self.db.write(batch)?;
        Ok(())
    }

    fn orphan_count(&self) -> Result<u64, StoreError> {
        let cf_ids = self.cf(CF_ORPHAN_IDS)?;

        let mut count = 0u64;
        for entry in self.db.iterator_cf(&cf_ids, IteratorMode::Start) {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}
