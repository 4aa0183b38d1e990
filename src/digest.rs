//! The digest collaborator.
//!
//! A byte-digest function producing a pointer-sized hash, for callers
//! constructing [`crate::hash_table::HashTable`] hash functions. Not
//! cryptographic — this is a fast, stable-within-a-process digest only.

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Returns a 64-bit hash of `bytes`, seeded with `seed`.
#[must_use]
pub fn digest64(seed: u64, bytes: &[u8]) -> u64 {
    xxh3_64_with_seed(bytes, seed)
}

/// Returns a pointer-sized hash of `bytes`, seeded with `seed`.
///
/// On 32-bit targets this folds the 64-bit digest down; on 64-bit targets
/// it is a plain truncation (identity, since `usize` is 64 bits there).
#[must_use]
pub fn digest(seed: usize, bytes: &[u8]) -> usize {
    let h = digest64(seed as u64, bytes);
    h as usize
}
