//! The effect of committing one entity over the current pointer table.

use std::collections::{BTreeMap, BTreeSet};

use catalyst_types::{EntityId, EntityType, Pointer};

/// What committing an entity would change, computed against one snapshot.
///
/// Every pointer of every displaced entity is accounted for: it is either
/// re-claimed by the incoming entity or listed in `orphan_pointers`. That is
/// what keeps the pointer table free of dangling entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverwritePlan {
    pub entity_type: EntityType,
    pub incoming: EntityId,
    /// Pointers the incoming entity claims.
    pub claimed: BTreeSet<Pointer>,
    /// Entities that lose at least one pointer, and therefore all of them.
    pub displaced: BTreeSet<EntityId>,
    /// Pointers of displaced entities that the incoming entity does not claim.
    pub orphan_pointers: BTreeSet<Pointer>,
    /// Owner of each claimed pointer before the commit. Absent means free.
    pub previous: BTreeMap<Pointer, EntityId>,
}

impl OverwritePlan {
    /// Returns `true` if nothing is displaced.
    pub fn is_fresh_claim(&self) -> bool {
        self.displaced.is_empty()
    }

    /// Every pointer whose ownership the commit changes.
    pub fn touched_pointers(&self) -> BTreeSet<Pointer> {
        self.claimed.union(&self.orphan_pointers).cloned().collect()
    }
}
