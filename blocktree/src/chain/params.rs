//! Per-network chain parameters.

use crate::types::{BlockHash, BlockHeader, CompactTarget, Hash256};

/// Parameters that pin a block tree to one network.
///
/// The genesis header is carried in full so the store can be seeded from
/// its computed hash and its difficulty target, and so the hash constant
/// never has to be duplicated by hand.
#[derive(Clone, Copy, Debug)]
pub struct NetworkParams {
    /// The network's fixed genesis header.
    pub genesis_header: BlockHeader,
    /// The network's difficulty-1 reference target.
    pub difficulty_1_bits: CompactTarget,
}

/// Merkle root shared by the mainnet and testnet3 genesis blocks (both
/// contain the same single coinbase transaction).
const GENESIS_MERKLE_ROOT: &str =
    "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

impl NetworkParams {
    /// Parameters for testnet3.
    pub fn testnet() -> Self {
        Self {
            genesis_header: BlockHeader {
                version: 1,
                previous_block_hash: BlockHash::zero(),
                merkle_root: Hash256::from_display_hex(GENESIS_MERKLE_ROOT)
                    .expect("hard-coded genesis merkle root should parse"),
                timestamp: 1_296_688_602,
                bits: CompactTarget(0x1d00ffff),
                nonce: 414_098_458,
            },
            difficulty_1_bits: CompactTarget(0x1d00ffff),
        }
    }

    /// Parameters for mainnet.
    pub fn mainnet() -> Self {
        Self {
            genesis_header: BlockHeader {
                version: 1,
                previous_block_hash: BlockHash::zero(),
                merkle_root: Hash256::from_display_hex(GENESIS_MERKLE_ROOT)
                    .expect("hard-coded genesis merkle root should parse"),
                timestamp: 1_231_006_505,
                bits: CompactTarget(0x1d00ffff),
                nonce: 2_083_236_893,
            },
            difficulty_1_bits: CompactTarget(0x1d00ffff),
        }
    }

    /// Hash of the network's genesis block.
    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis_header.compute_hash()
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::testnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_genesis_hash_is_the_published_one() {
        let params = NetworkParams::testnet();
        assert_eq!(
            params.genesis_hash().to_display_hex(),
            "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943"
        );
    }

    #[test]
    fn mainnet_genesis_hash_is_the_published_one() {
        let params = NetworkParams::mainnet();
        assert_eq!(
            params.genesis_hash().to_display_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }
}
