use std::fmt;

use catalyst_types::EntityType;

/// Namespace of a storage key.
///
/// Keys are only unique within a category: the same string can name a
/// content file and a pointer record without conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageCategory {
    /// Content files and entity files, keyed by content hash hex.
    Contents,
    /// Pointer records of one entity type, keyed by pointer.
    Pointers(EntityType),
    /// History events, keyed by zero-padded timestamp.
    History,
    /// Audit proofs, keyed by `<type>-<entity id>`.
    Proofs,
}

impl StorageCategory {
    /// Stable on-disk name.
    pub fn name(&self) -> String {
        match self {
            StorageCategory::Contents => "contents".to_string(),
            StorageCategory::Pointers(ty) => format!("pointers-{ty}"),
            StorageCategory::History => "history".to_string(),
            StorageCategory::Proofs => "proofs".to_string(),
        }
    }

    /// Every category, pointer categories in [`EntityType::ALL`] order.
    pub fn all() -> Vec<StorageCategory> {
        let mut all = vec![StorageCategory::Contents];
        all.extend(EntityType::ALL.into_iter().map(StorageCategory::Pointers));
        all.push(StorageCategory::History);
        all.push(StorageCategory::Proofs);
        all
    }
}

impl fmt::Display for StorageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names() {
        assert_eq!(StorageCategory::Contents.name(), "contents");
        assert_eq!(
            StorageCategory::Pointers(EntityType::Scene).name(),
            "pointers-scene"
        );
        assert_eq!(StorageCategory::History.name(), "history");
        assert_eq!(StorageCategory::Proofs.name(), "proofs");
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<String> = StorageCategory::all().iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), StorageCategory::all().len());
    }
}
