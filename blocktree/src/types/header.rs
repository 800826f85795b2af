//! Block header type and canonical hashing.
//!
//! The acceptance pipeline consumes headers that were already parsed from
//! the wire; this module carries the parsed fields and re-emits the
//! canonical 80-byte serialization (fixed-width fields, little-endian
//! multi-byte integers) that the block identity digest is computed over.
//! The serialization must stay bit-exact with the network's header format
//! or every computed hash diverges from the rest of the network.

use serde::{Deserialize, Serialize};

use super::{BlockHash, CompactTarget, Hash256};

/// Serialized size of a block header in bytes.
pub const HEADER_LEN: usize = 80;

/// A parsed block header.
///
/// Only `previous_block_hash` and `bits` are interpreted by the
/// acceptance pipeline; the remaining fields participate solely in the
/// canonical serialization that the block hash is computed over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block version signalled by the miner.
    pub version: i32,
    /// Hash of the parent block; all zeroes for genesis.
    pub previous_block_hash: BlockHash,
    /// Merkle root over the block's transactions.
    pub merkle_root: Hash256,
    /// Block timestamp, seconds since Unix epoch.
    pub timestamp: u32,
    /// Compact difficulty target this block was mined against.
    pub bits: CompactTarget,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Returns the canonical 80-byte wire serialization of this header.
    ///
    /// Field order and widths follow the network header format:
    /// version (4, LE), previous block hash (32), merkle root (32),
    /// timestamp (4, LE), bits (4, LE), nonce (4, LE). All hashing that
    /// depends on a "canonical" form goes through this method to avoid
    /// format drift.
    pub fn serialized_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.previous_block_hash.as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.as_bytes());
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_bits().to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Computes the canonical double SHA-256 block hash for this header.
    ///
    /// The header is serialized with [`BlockHeader::serialized_bytes`]
    /// and the resulting bytes are hashed with [`Hash256::compute`].
    /// This must remain stable across nodes for chain bookkeeping to
    /// agree on block identities.
    pub fn compute_hash(&self) -> BlockHash {
        let bytes = self.serialized_bytes();
        BlockHash(Hash256::compute(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The real Bitcoin testnet3 genesis header.
    fn testnet_genesis_header() -> BlockHeader {
        BlockHeader {
            version: 1,
            previous_block_hash: BlockHash::zero(),
            merkle_root: Hash256::from_display_hex(
                "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            )
            .expect("hard-coded merkle root should parse"),
            timestamp: 1_296_688_602,
            bits: CompactTarget(0x1d00ffff),
            nonce: 414_098_458,
        }
    }

    #[test]
    fn serialization_is_eighty_bytes_little_endian() {
        let header = testnet_genesis_header();
        let bytes = header.serialized_bytes();

        assert_eq!(bytes.len(), HEADER_LEN);
        // version = 1, little endian.
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        // bits = 0x1d00ffff, little endian.
        assert_eq!(&bytes[72..76], &[0xff, 0xff, 0x00, 0x1d]);
    }

    #[test]
    fn testnet_genesis_hash_matches_network() {
        let header = testnet_genesis_header();
        let hash = header.compute_hash();

        assert_eq!(
            hash.to_display_hex(),
            "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943"
        );
    }

    #[test]
    fn hash_is_deterministic_and_sensitive_to_fields() {
        let header = testnet_genesis_header();
        assert_eq!(header.compute_hash(), header.compute_hash());

        let mut tweaked = header;
        tweaked.nonce += 1;
        assert_ne!(header.compute_hash(), tweaked.compute_hash());
    }
}
