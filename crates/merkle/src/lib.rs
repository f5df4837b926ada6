//! Merkle trees over token ids as committed to by criteria orders.
//!
//! Leaves are `keccak256(abi.encode(uint256 id))` and every level hashes
//! sorted pairs, so the order in which ids are supplied never changes the
//! root. Levels of odd width are padded with a zero hash which makes every
//! proof exactly [`MerkleTree::depth`] siblings long.

use {
    alloy_primitives::{B256, U256, keccak256},
    itertools::Itertools,
};

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum Error {
    #[error("cannot build a merkle tree without leaves")]
    Empty,
}

/// Hashed leaf for a token id.
pub fn leaf(id: U256) -> B256 {
    keccak256(id.to_be_bytes::<32>())
}

/// Hashes two nodes in sorted order.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(lo.as_slice());
    buffer[32..].copy_from_slice(hi.as_slice());
    keccak256(buffer)
}

/// Verifies that `id` is committed to by `root`.
///
/// `depth` is the proof length the verifier expects and is checked before
/// any hashing: truncated or extended proofs are rejected even if they would
/// happen to hash to the root.
pub fn verify(root: B256, id: U256, proof: &[B256], depth: usize) -> bool {
    if proof.len() != depth {
        return false;
    }
    proof.iter().fold(leaf(id), |node, sibling| hash_pair(node, *sibling)) == root
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    ids: Vec<U256>,
    /// `levels[0]` are the hashed leaves, the last level holds the root.
    levels: Vec<Vec<B256>>,
}

impl MerkleTree {
    pub fn new(ids: impl IntoIterator<Item = U256>) -> Result<Self, Error> {
        let ids = ids.into_iter().sorted().dedup().collect::<Vec<_>>();
        if ids.is_empty() {
            return Err(Error::Empty);
        }

        let mut levels = vec![ids.iter().copied().map(leaf).collect::<Vec<_>>()];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next = level
                .chunks(2)
                .map(|pair| hash_pair(pair[0], pair.get(1).copied().unwrap_or_default()))
                .collect();
            levels.push(next);
        }

        Ok(Self { ids, levels })
    }

    pub fn root(&self) -> B256 {
        // `new` guarantees at least one level with exactly one node at the top.
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_default()
    }

    /// Number of siblings in every proof, `ceil(log2(n))`.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// The sorted and deduplicated ids of the tree.
    pub fn ids(&self) -> &[U256] {
        &self.ids
    }

    pub fn contains(&self, id: U256) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Inclusion proof for `id`, `None` if the id is not part of the tree.
    pub fn proof(&self, id: U256) -> Option<Vec<B256>> {
        let mut index = self.ids.binary_search(&id).ok()?;
        let mut proof = Vec::with_capacity(self.depth());
        for level in &self.levels[..self.depth()] {
            proof.push(level.get(index ^ 1).copied().unwrap_or_default());
            index /= 2;
        }
        Some(proof)
    }
}

/// Root of the tree over `ids`, or the zero hash for an empty set.
///
/// Criteria orders use the zero root to accept any token of a collection.
pub fn root(ids: impl IntoIterator<Item = U256>) -> B256 {
    MerkleTree::new(ids)
        .map(|tree| tree.root())
        .unwrap_or_default()
}
