//! Key digests and bucket reduction.
//!
//! A [`ProbeTable`] never hashes keys itself. It asks a [`Digest`] for the
//! integer identity of a key and a [`Bucket`] for the slot at which probing for
//! that identity starts. Both are pure functions; any deterministic pair
//! satisfies the table's contract.
//!
//! [`ProbeTable`]: crate::ProbeTable

use core::num::NonZeroUsize;

/// Derives a deterministic integer digest from a key.
///
/// Equal keys must produce equal digests. Distinct keys may collide; the table
/// compares key strings after digests so collisions cost probe length, not
/// correctness.
///
/// Any `Fn(&str) -> u64` is a digest:
///
/// ```rust
/// # use probe_table::ProbeTable;
/// # use probe_table::digest::ModuloBucket;
/// #
/// let mut table =
///     ProbeTable::with_capacity_and_hashers(8, |key: &str| key.len() as u64, ModuloBucket)
///         .unwrap();
/// assert!(table.upsert("four", "4"));
/// assert_eq!(table.get("four"), "4");
/// ```
pub trait Digest {
    /// Returns the digest of `key`.
    fn digest(&self, key: &str) -> u64;
}

impl<F> Digest for F
where
    F: Fn(&str) -> u64,
{
    #[inline]
    fn digest(&self, key: &str) -> u64 {
        self(key)
    }
}

/// Maps a digest to the slot index where probing starts.
///
/// Implementations must return an index in `0..capacity` and must be
/// deterministic for a given `(digest, capacity)` pair.
pub trait Bucket {
    /// Returns the starting slot for `digest` in a table of `capacity` slots.
    fn bucket(&self, digest: u64, capacity: NonZeroUsize) -> usize;
}

/// Bernstein's djb2 string hash.
///
/// Starts at 5381 and folds in each byte as `h * 33 + byte` using 32-bit
/// wrapping arithmetic. Bytes are taken as unsigned, so non-ASCII keys hash
/// the same on every target.
///
/// This is a fine hash for small tables of human-readable keys and a poor one
/// for adversarial input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Djb2;

impl Djb2 {
    /// Initial value of the running hash.
    pub const SEED: u32 = 5381;

    /// Hashes `key` without going through the trait.
    #[inline]
    pub const fn hash(key: &str) -> u32 {
        let bytes = key.as_bytes();
        let mut hash = Self::SEED;
        let mut i = 0;
        while i < bytes.len() {
            hash = (hash << 5).wrapping_add(hash).wrapping_add(bytes[i] as u32);
            i += 1;
        }
        hash
    }
}

impl Digest for Djb2 {
    #[inline]
    fn digest(&self, key: &str) -> u64 {
        u64::from(Self::hash(key))
    }
}

/// Digest backed by foldhash with a fixed seed.
///
/// Much better distribution than [`Djb2`] for machine-generated keys. The seed
/// is fixed so that digests are stable for the lifetime of the value.
#[cfg(feature = "foldhash")]
#[derive(Debug, Clone)]
pub struct FoldDigest {
    state: foldhash::fast::FixedState,
}

#[cfg(feature = "foldhash")]
impl FoldDigest {
    /// Creates a digest using the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: foldhash::fast::FixedState::with_seed(seed),
        }
    }
}

#[cfg(feature = "foldhash")]
impl Default for FoldDigest {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

#[cfg(feature = "foldhash")]
impl Digest for FoldDigest {
    #[inline]
    fn digest(&self, key: &str) -> u64 {
        use core::hash::BuildHasher;

        self.state.hash_one(key)
    }
}

/// Reduces a digest to a bucket with `digest % capacity`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuloBucket;

impl Bucket for ModuloBucket {
    #[inline]
    fn bucket(&self, digest: u64, capacity: NonZeroUsize) -> usize {
        // Lossless: the remainder is below `capacity`, which fits in usize.
        (digest % capacity.get() as u64) as usize
    }
}

/// Multiplicative (Fibonacci) reduction.
///
/// Scrambles the digest with the 64-bit golden-ratio constant and scales the
/// result into `0..capacity`. Keeps sequential digests from landing in
/// sequential buckets, which shortens linear-probing clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FibonacciBucket;

impl FibonacciBucket {
    const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
}

impl Bucket for FibonacciBucket {
    #[inline]
    fn bucket(&self, digest: u64, capacity: NonZeroUsize) -> usize {
        let scrambled = digest.wrapping_mul(Self::GOLDEN);
        ((u128::from(scrambled) * capacity.get() as u128) >> 64) as usize
    }
}
