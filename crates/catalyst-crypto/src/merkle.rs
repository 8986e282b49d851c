use catalyst_types::ContentHash;

/// Binary Merkle tree over content hashes.
///
/// Used to commit a history snapshot to the exact sequence of deployment
/// events it covers. Leaf order matters: the same hashes in a different
/// order produce a different root.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: ContentHash,
    leaf_count: usize,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    ///
    /// An empty list produces [`ContentHash::ZERO`]. A single leaf is its own
    /// root. An odd node at any level is paired with itself.
    pub fn from_leaves(leaves: &[ContentHash]) -> Self {
        if leaves.is_empty() {
            return Self {
                root: ContentHash::ZERO,
                leaf_count: 0,
            };
        }

        let mut level = leaves.to_vec();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
        }

        Self {
            root: level[0],
            leaf_count: leaves.len(),
        }
    }

    pub fn root(&self) -> ContentHash {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }
}

fn hash_pair(left: &ContentHash, right: &ContentHash) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"catalyst-merkle-v1:");
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    ContentHash::from_hash(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;

    fn leaf(seed: u8) -> ContentHash {
        ContentHasher::EVENT.hash(&[seed])
    }

    #[test]
    fn empty_tree_has_zero_root() {
        let tree = MerkleTree::from_leaves(&[]);
        assert!(tree.root().is_zero());
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn single_leaf_is_root() {
        let l = leaf(1);
        assert_eq!(MerkleTree::from_leaves(&[l]).root(), l);
    }

    #[test]
    fn two_leaves_produce_parent() {
        let tree = MerkleTree::from_leaves(&[leaf(1), leaf(2)]);
        assert_eq!(tree.root(), hash_pair(&leaf(1), &leaf(2)));
    }

    #[test]
    fn odd_leaf_pairs_with_itself() {
        let tree = MerkleTree::from_leaves(&[leaf(1), leaf(2), leaf(3)]);
        let expected = hash_pair(
            &hash_pair(&leaf(1), &leaf(2)),
            &hash_pair(&leaf(3), &leaf(3)),
        );
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn order_matters() {
        let a = MerkleTree::from_leaves(&[leaf(1), leaf(2)]);
        let b = MerkleTree::from_leaves(&[leaf(2), leaf(1)]);
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn deterministic_root() {
        let leaves: Vec<ContentHash> = (0..10).map(leaf).collect();
        assert_eq!(
            MerkleTree::from_leaves(&leaves).root(),
            MerkleTree::from_leaves(&leaves).root()
        );
    }
}
