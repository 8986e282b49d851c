//! Content addressing for deployment batches.

use std::collections::BTreeMap;

use catalyst_types::{ContentHash, DeploymentFile};

use crate::hasher::ContentHasher;

/// Content address of a single file.
pub fn hash_file(file: &DeploymentFile) -> ContentHash {
    ContentHasher::FILE.hash(&file.content)
}

/// Content addresses of every file in a batch.
///
/// Files with identical bytes collapse to a single entry, so the keys of the
/// result are exactly the distinct objects the batch would write. When two
/// names share bytes the first one submitted is kept.
pub fn hash_all<'a, I>(files: I) -> BTreeMap<ContentHash, DeploymentFile>
where
    I: IntoIterator<Item = &'a DeploymentFile>,
{
    let mut hashes = BTreeMap::new();
    for file in files {
        hashes.entry(hash_file(file)).or_insert_with(|| file.clone());
    }
    hashes
}
