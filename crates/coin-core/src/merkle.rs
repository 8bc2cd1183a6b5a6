//! Merkle tree computation over transaction hashes.

use crate::hash::{Hash, Hasher, HASH_SIZE};

/// Build the full merkle tree for an ordered list of hashes.
///
/// The returned vector holds every row, leaves first and the root last. A row
/// with an odd number of hashes has its last hash duplicated before pairing,
/// and the duplicate is kept in the returned tree.
pub fn merkle_tree<H: Hasher + ?Sized>(hashes: &[Hash], hasher: &H) -> Vec<Hash> {
    let mut tree: Vec<Hash> = Vec::with_capacity(hashes.len() * 2 + 1);
    tree.extend_from_slice(hashes);

    let mut row_start = 0;
    let mut row_len = hashes.len();

    while row_len > 1 {
        if row_len % 2 != 0 {
            let last = tree[tree.len() - 1];
            tree.push(last);
            row_len += 1;
        }

        let next_start = row_start + row_len;
        for i in (row_start..next_start).step_by(2) {
            let mut combined = [0u8; HASH_SIZE * 2];
            combined[..HASH_SIZE].copy_from_slice(tree[i].as_bytes());
            combined[HASH_SIZE..].copy_from_slice(tree[i + 1].as_bytes());
            tree.push(hasher.hash(&combined));
        }

        row_start = next_start;
        row_len /= 2;
    }

    tree
}

/// Compute the merkle root of an ordered list of hashes.
///
/// An empty list yields the all-zero hash; a single hash is its own root.
pub fn merkle_root<H: Hasher + ?Sized>(hashes: &[Hash], hasher: &H) -> Hash {
    merkle_tree(hashes, hasher).last().copied().unwrap_or(Hash::ZERO)
}
