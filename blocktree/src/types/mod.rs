//! Core domain types used by the block tree
//!
//! This module defines strongly-typed hashes, block identifiers, and the
//! compact difficulty-target encoding that are shared across the chain
//! implementation. The goal is to avoid "naked" byte buffers and bare
//! `u32`s in public APIs and instead use domain-specific newtypes.

use serde::{Deserialize, Serialize};

/// Block header type and its canonical wire serialization.
pub mod header;

pub use header::BlockHeader;

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (double SHA-256).
///
/// This type is used as the backing representation for all fixed-size
/// hashes in the chain (block identities, merkle roots, parent links).
/// It is always exactly [`HASH_LEN`] bytes long and stores the digest in
/// internal (little-endian) byte order, the same order the digest is
/// produced in by the hash function.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the double SHA-256 digest of `data`.
    ///
    /// This is the SHA-256d construction used for block identities:
    /// `SHA256(SHA256(data))`. The result is deterministic for a given
    /// byte slice.
    pub fn compute(data: &[u8]) -> Self {
        use sha2::{Digest, Sha256};

        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        Hash256(second.into())
    }

    /// The all-zero hash, used as the parent link of the genesis header.
    pub const fn zero() -> Self {
        Hash256([0u8; HASH_LEN])
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    ///
    /// This is useful when interfacing with low-level APIs that expect a
    /// fixed-size byte array instead of a newtype wrapper.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Parses a hash from its display form: 64 hex characters in the
    /// byte-reversed order block explorers and RPC interfaces use.
    pub fn from_display_hex(s: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(s).map_err(|_| "invalid hex encoding")?;
        if bytes.len() != HASH_LEN {
            return Err("expected 32-byte hash");
        }
        let mut arr = [0u8; HASH_LEN];
        for (i, b) in bytes.iter().rev().enumerate() {
            arr[i] = *b;
        }
        Ok(Hash256(arr))
    }

    /// Renders the hash in display order (byte-reversed hex).
    pub fn to_display_hex(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }
}

/// Strongly-typed block hash.
///
/// This is the content hash of a [`BlockHeader`], computed as a double
/// SHA-256 digest over the canonical 80-byte header serialization.
/// Wrapping the underlying [`Hash256`] avoids passing raw byte arrays
/// around in public APIs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockHash(pub Hash256);

impl BlockHash {
    /// The all-zero hash that genesis headers carry as their parent link.
    pub const fn zero() -> Self {
        BlockHash(Hash256::zero())
    }

    /// Returns the underlying digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        self.0.as_bytes()
    }

    /// Parses a block hash from display-order hex.
    pub fn from_display_hex(s: &str) -> Result<Self, &'static str> {
        Hash256::from_display_hex(s).map(BlockHash)
    }

    /// Renders the block hash in display order (byte-reversed hex).
    pub fn to_display_hex(&self) -> String {
        self.0.to_display_hex()
    }
}

/// Compact difficulty-target encoding ("bits").
///
/// The 32-bit value packs an unsigned base-256 floating point number:
/// the low 24 bits are the mantissa (`base`) and the high byte is the
/// `exponent`, so the encoded target is `base * 256^(exponent - 3)`.
/// A larger target means lower difficulty.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CompactTarget(pub u32);

impl CompactTarget {
    /// Mantissa of the encoded target (low 24 bits).
    pub fn base(&self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    /// Exponent of the encoded target (high byte).
    pub fn exponent(&self) -> u32 {
        self.0 >> 24
    }

    /// Returns the raw 32-bit encoding, as carried in the header.
    pub fn to_bits(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_display_hex_roundtrip_reverses_bytes() {
        let mut bytes = [0u8; HASH_LEN];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hash = Hash256(bytes);

        let display = hash.to_display_hex();
        assert!(display.starts_with("01"));
        assert!(display.ends_with("ab"));

        let parsed = Hash256::from_display_hex(&display).expect("valid hex");
        assert_eq!(parsed, hash);
    }

    #[test]
    fn from_display_hex_rejects_bad_input() {
        assert!(Hash256::from_display_hex("zz").is_err());
        assert!(Hash256::from_display_hex("abcd").is_err());
    }

    #[test]
    fn compact_target_splits_base_and_exponent() {
        let bits = CompactTarget(0x1d00ffff);
        assert_eq!(bits.base(), 0x00ffff);
        assert_eq!(bits.exponent(), 0x1d);

        let bits = CompactTarget(0x1b0404cb);
        assert_eq!(bits.base(), 0x0404cb);
        assert_eq!(bits.exponent(), 0x1b);
    }

    #[test]
    fn double_sha256_matches_known_vector() {
        // SHA256d("hello") is a well-known test vector.
        let digest = Hash256::compute(b"hello");
        assert_eq!(
            hex::encode(digest.as_bytes()),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }
}
