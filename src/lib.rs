//! # lart-rs
//!
//! An in-memory ordered index mapping fixed-width byte-string keys to
//! opaque tuple identifiers, built as an adaptive radix tree with a
//! learned bulk-load path.
//!
//! Based on "The Adaptive Radix Tree: ARTful Indexing for Main-Memory
//! Databases" (ICDE 2013, Leis et al.), with a linear-model bucket node
//! used during bulk construction.
//!
//! Key features:
//! - Adaptive inner-node fanout (4, 16, 48, 256 children)
//! - Path compression with on-demand verification of long prefixes
//! - Leaves are tagged tuple identifiers, never separate allocations
//! - Bulk loading scatters keys through a per-node fitted linear model
//!
//! The index never stores key bytes for its leaves. The caller supplies a
//! [`KeyLoader`] that reconstructs the canonical key encoding of any tuple
//! identifier on demand, and keys handed to the operations must match that
//! encoding.
//!
//! ## Example
//!
//! ```rust
//! use lart_rs::LearnedArt;
//!
//! let mut index = LearnedArt::new();
//! index.insert(&42u64.to_be_bytes(), 42);
//! index.insert(&7u64.to_be_bytes(), 7);
//!
//! assert_eq!(index.lookup(&42u64.to_be_bytes()), Some(42));
//! assert_eq!(index.minimum(), Some(7));
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod bulk;
mod node;
mod stats;
mod tree;

#[cfg(test)]
mod proptests;

pub use node::NodeKind;
pub use stats::ProfileReport;

use node::Slot;
use tree::Keys;

/// Reconstructs the canonical byte encoding of a key from its tuple
/// identifier. Implementations must be pure and order-preserving: `a < b`
/// exactly when `load_key(a)` sorts before `load_key(b)` byte-wise.
pub trait KeyLoader {
    /// Write the key of `tid` into `out`, which has the index's key length.
    fn load_key(&self, tid: u64, out: &mut [u8]);
}

/// The stock loader: tuple identifiers are 64-bit unsigned keys, encoded
/// big-endian into 8 bytes. Signed workloads must offset by `2^63` before
/// encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigEndianKeys;

impl KeyLoader for BigEndianKeys {
    fn load_key(&self, tid: u64, out: &mut [u8]) {
        out.copy_from_slice(&tid.to_be_bytes());
    }
}

/// An adaptive radix tree over fixed-width keys with a learned bulk-load
/// path.
///
/// Keys are compared as byte strings; for integer keys the big-endian
/// encoding of [`BigEndianKeys`] makes byte order match numeric order.
/// Tuple identifiers must fit in 63 bits. The tree is single-threaded.
pub struct LearnedArt<L: KeyLoader = BigEndianKeys> {
    root: Slot,
    loader: L,
    key_len: usize,
    len: usize,
}

impl LearnedArt<BigEndianKeys> {
    /// An empty index over 8-byte big-endian `u64` keys.
    pub fn new() -> Self {
        Self::with_loader(BigEndianKeys, 8)
    }
}

impl Default for LearnedArt<BigEndianKeys> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: KeyLoader> LearnedArt<L> {
    /// An empty index whose keys are `key_len` bytes wide, reconstructed
    /// through `loader`.
    pub fn with_loader(loader: L, key_len: usize) -> Self {
        assert!(key_len > 0, "keys must have at least one byte");
        Self { root: None, loader, key_len, len: 0 }
    }

    fn keys(&self) -> Keys<'_, L> {
        Keys { loader: &self.loader, key_len: self.key_len }
    }

    /// Number of keys in the index.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `key` mapping to `tid`; `key` must be the loader's encoding
    /// of `tid`. Returns the previous tuple identifier if the key was
    /// already present.
    pub fn insert(&mut self, key: &[u8], tid: u64) -> Option<u64> {
        assert!(tid < 1 << 63, "tuple identifier does not fit in 63 bits");
        assert_eq!(key.len(), self.key_len, "key width mismatch");
        let ks = Keys { loader: &self.loader, key_len: self.key_len };
        let old = tree::insert(&ks, &mut self.root, key, 0, tid);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Find `key`, optimistically: compressed paths longer than the stored
    /// cap are skipped on the way down and verified once at the leaf.
    pub fn lookup(&self, key: &[u8]) -> Option<u64> {
        assert_eq!(key.len(), self.key_len, "key width mismatch");
        tree::lookup(&self.keys(), &self.root, key)
    }

    /// Find `key`, pessimistically: every compressed path is verified while
    /// descending.
    pub fn lookup_pessimistic(&self, key: &[u8]) -> Option<u64> {
        assert_eq!(key.len(), self.key_len, "key width mismatch");
        tree::lookup_pessimistic(&self.keys(), &self.root, key)
    }

    /// Remove `key`, returning its tuple identifier. Erasing an absent key
    /// is a no-op.
    pub fn erase(&mut self, key: &[u8]) -> Option<u64> {
        assert_eq!(key.len(), self.key_len, "key width mismatch");
        let ks = Keys { loader: &self.loader, key_len: self.key_len };
        let removed = tree::erase(&ks, &mut self.root, key, 0);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Build the index from a dataset of distinct tuple identifiers, using
    /// the learned scatter for large partitions whose next key byte the
    /// fitted model separates cleanly, and the adaptive insert path for the
    /// rest. The index must be empty; the dataset need not be sorted.
    pub fn bulk_insert(&mut self, tids: &[u64]) {
        if tids.is_empty() {
            return;
        }
        assert!(self.root.is_none(), "bulk load requires an empty index");
        for &tid in tids {
            assert!(tid < 1 << 63, "tuple identifier does not fit in 63 bits");
        }
        let ks = Keys { loader: &self.loader, key_len: self.key_len };
        bulk::bulk_load(&ks, &mut self.root, tids, 0);
        self.len = tids.len();
    }

    /// Tuple identifier of the smallest key, if any.
    pub fn minimum(&self) -> Option<u64> {
        match &self.root {
            None => None,
            Some(node::Child::Leaf(tid)) => Some(*tid),
            Some(node::Child::Inner(node)) => Some(tree::minimum_inner(node)),
        }
    }

    /// Tuple identifier of the largest key, if any.
    pub fn maximum(&self) -> Option<u64> {
        match &self.root {
            None => None,
            Some(node::Child::Leaf(tid)) => Some(*tid),
            Some(node::Child::Inner(node)) => Some(tree::maximum_inner(node)),
        }
    }

    /// Census of inner nodes and used fanout per variant.
    pub fn profile(&self) -> ProfileReport {
        stats::profile(&self.root)
    }
}
