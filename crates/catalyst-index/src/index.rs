//! The authoritative pointer table.
//!
//! [`EntityIndex`] keeps the two coupled tables, `entities_by_id` and
//! `pointers_by_type`, behind one `RwLock`. Readers take the read lock and
//! see a consistent snapshot; an overwrite is applied under a single write
//! lock, so no reader ever observes a half-applied commit.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use catalyst_types::{Entity, EntityId, EntityType, Pointer};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::plan::OverwritePlan;

/// Pointer tables of every type: type -> (pointer -> entity id).
pub type PointerTables = BTreeMap<EntityType, BTreeMap<Pointer, EntityId>>;

#[derive(Debug, Default)]
struct IndexState {
    entities_by_id: HashMap<EntityId, Entity>,
    pointers_by_type: HashMap<EntityType, BTreeMap<Pointer, EntityId>>,
}

impl IndexState {
    fn owner(&self, entity_type: EntityType, pointer: &Pointer) -> Option<&EntityId> {
        self.pointers_by_type.get(&entity_type)?.get(pointer)
    }

    fn occupants<'a>(
        &'a self,
        entity_type: EntityType,
        pointers: impl IntoIterator<Item = &'a Pointer>,
    ) -> Vec<&'a Entity> {
        let mut seen = HashSet::new();
        pointers
            .into_iter()
            .filter_map(|p| self.owner(entity_type, p))
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.entities_by_id.get(id))
            .collect()
    }
}

/// In-memory mapping from pointers to entities, per entity type.
///
/// Invariant: for every `(type, pointer, id)` in the pointer table,
/// `entities_by_id[id]` exists and claims `pointer`; and every pointer of
/// every live entity maps back to it.
#[derive(Debug, Default)]
pub struct EntityIndex {
    state: RwLock<IndexState>,
}

impl EntityIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> IndexResult<RwLockReadGuard<'_, IndexState>> {
        self.state
            .read()
            .map_err(|e| IndexError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> IndexResult<RwLockWriteGuard<'_, IndexState>> {
        self.state
            .write()
            .map_err(|e| IndexError::LockPoisoned(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Entities currently occupying any of `pointers`, without duplicates,
    /// in order of first match.
    pub fn entities_by_pointers(
        &self,
        entity_type: EntityType,
        pointers: &[Pointer],
    ) -> IndexResult<Vec<Entity>> {
        let state = self.read()?;
        Ok(state
            .occupants(entity_type, pointers)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Live entities of `entity_type` among `ids`, without duplicates.
    pub fn entities_by_ids(
        &self,
        entity_type: EntityType,
        ids: &[EntityId],
    ) -> IndexResult<Vec<Entity>> {
        let state = self.read()?;
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| state.entities_by_id.get(id))
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect())
    }

    /// A single live entity.
    pub fn entity(&self, id: &EntityId) -> IndexResult<Option<Entity>> {
        Ok(self.read()?.entities_by_id.get(id).cloned())
    }

    /// Returns `true` if `id` is live.
    pub fn contains(&self, id: &EntityId) -> IndexResult<bool> {
        Ok(self.read()?.entities_by_id.contains_key(id))
    }

    /// Current owner of a pointer.
    pub fn owner(&self, entity_type: EntityType, pointer: &Pointer) -> IndexResult<Option<EntityId>> {
        Ok(self.read()?.owner(entity_type, pointer).copied())
    }

    /// Every occupied pointer of `entity_type`, sorted.
    pub fn active_pointers(&self, entity_type: EntityType) -> IndexResult<Vec<Pointer>> {
        let state = self.read()?;
        Ok(state
            .pointers_by_type
            .get(&entity_type)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// A copy of every pointer table. Types without pointers are omitted.
    pub fn active_entities(&self) -> IndexResult<PointerTables> {
        let state = self.read()?;
        Ok(state
            .pointers_by_type
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(ty, table)| (*ty, table.clone()))
            .collect())
    }

    /// Number of live entities.
    pub fn len(&self) -> IndexResult<usize> {
        Ok(self.read()?.entities_by_id.len())
    }

    pub fn is_empty(&self) -> IndexResult<bool> {
        Ok(self.len()? == 0)
    }

    // -----------------------------------------------------------------------
    // Overwrite
    // -----------------------------------------------------------------------

    /// Pointers whose ownership a commit of `pointers` could read or change:
    /// the pointers themselves plus every pointer of every current occupant.
    pub fn footprint(
        &self,
        entity_type: EntityType,
        pointers: &[Pointer],
    ) -> IndexResult<BTreeSet<Pointer>> {
        let state = self.read()?;
        let mut footprint: BTreeSet<Pointer> = pointers.iter().cloned().collect();
        for occupant in state.occupants(entity_type, pointers) {
            footprint.extend(occupant.pointers.iter().cloned());
        }
        Ok(footprint)
    }

    /// Compute what committing `entity` would change.
    ///
    /// Every entity holding any claimed pointer is displaced as a whole.
    /// Its pointers the incoming entity does not claim become orphans.
    pub fn plan_overwrite(&self, entity: &Entity) -> IndexResult<OverwritePlan> {
        let state = self.read()?;
        let claimed: BTreeSet<Pointer> = entity.pointers.iter().cloned().collect();

        let previous: BTreeMap<Pointer, EntityId> = claimed
            .iter()
            .filter_map(|p| state.owner(entity.entity_type, p).map(|id| (p.clone(), *id)))
            .collect();

        let mut displaced = BTreeSet::new();
        let mut orphan_pointers = BTreeSet::new();
        for occupant in state.occupants(entity.entity_type, &claimed) {
            displaced.insert(occupant.id);
            orphan_pointers.extend(
                occupant
                    .pointers
                    .iter()
                    .filter(|p| !claimed.contains(*p))
                    .cloned(),
            );
        }

        Ok(OverwritePlan {
            entity_type: entity.entity_type,
            incoming: entity.id,
            claimed,
            displaced,
            orphan_pointers,
            previous,
        })
    }

    /// Apply a plan atomically: drop orphan pointers and displaced entities,
    /// then insert `entity` and point every claimed pointer at it.
    ///
    /// Fails without changing anything if any claimed pointer changed owner
    /// since the plan was computed.
    pub fn apply(&self, entity: Entity, plan: &OverwritePlan) -> IndexResult<()> {
        let mut state = self.write()?;

        for pointer in &plan.claimed {
            if state.owner(plan.entity_type, pointer) != plan.previous.get(pointer) {
                return Err(IndexError::StalePlan {
                    entity_type: plan.entity_type,
                    pointer: pointer.clone(),
                });
            }
        }

        let IndexState {
            entities_by_id,
            pointers_by_type,
        } = &mut *state;
        let table = pointers_by_type.entry(plan.entity_type).or_default();
        for orphan in &plan.orphan_pointers {
            table.remove(orphan);
        }
        for id in &plan.displaced {
            entities_by_id.remove(id);
        }
        for pointer in &plan.claimed {
            table.insert(pointer.clone(), entity.id);
        }
        debug!(
            entity_type = %plan.entity_type,
            entity = %entity.id.short_hex(),
            displaced = plan.displaced.len(),
            orphans = plan.orphan_pointers.len(),
            "overwrite applied"
        );
        entities_by_id.insert(entity.id, entity);
        Ok(())
    }

    /// Insert an entity recovered from storage.
    ///
    /// Unlike [`Self::apply`] this never displaces anything: restored state
    /// must already be consistent.
    pub fn insert_restored(&self, entity: Entity) -> IndexResult<()> {
        let mut state = self.write()?;
        for pointer in &entity.pointers {
            if let Some(owner) = state.owner(entity.entity_type, pointer) {
                if *owner != entity.id {
                    return Err(IndexError::PointerConflict {
                        entity_type: entity.entity_type,
                        pointer: pointer.clone(),
                        owner: *owner,
                    });
                }
            }
        }
        let table = state.pointers_by_type.entry(entity.entity_type).or_default();
        for pointer in &entity.pointers {
            table.insert(pointer.clone(), entity.id);
        }
        state.entities_by_id.insert(entity.id, entity);
        Ok(())
    }

    /// Verify that the two tables agree in both directions.
    pub fn check_invariants(&self) -> IndexResult<()> {
        let state = self.read()?;
        for (ty, table) in &state.pointers_by_type {
            for (pointer, id) in table {
                let entity = state.entities_by_id.get(id).ok_or_else(|| {
                    IndexError::InvariantViolation(format!(
                        "{ty} pointer '{pointer}' maps to missing entity {id}"
                    ))
                })?;
                if entity.entity_type != *ty || !entity.claims(pointer) {
                    return Err(IndexError::InvariantViolation(format!(
                        "{ty} pointer '{pointer}' maps to {id}, which does not claim it"
                    )));
                }
            }
        }
        for entity in state.entities_by_id.values() {
            for pointer in &entity.pointers {
                if state.owner(entity.entity_type, pointer) != Some(&entity.id) {
                    return Err(IndexError::InvariantViolation(format!(
                        "entity {} claims '{pointer}' but does not own it",
                        entity.id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalyst_types::{ContentHash, Timestamp};

    fn ptr(s: &str) -> Pointer {
        Pointer::new(s).unwrap()
    }

    fn ptrs(list: &[&str]) -> Vec<Pointer> {
        list.iter().map(|p| ptr(p)).collect()
    }

    fn entity(id: u8, entity_type: EntityType, pointers: &[&str]) -> Entity {
        Entity {
            id: ContentHash::from_hash([id; 32]),
            entity_type,
            pointers: ptrs(pointers),
            timestamp: Timestamp::from_millis(id as u64),
            content: vec![],
            metadata: None,
        }
    }

    fn commit(index: &EntityIndex, e: Entity) -> OverwritePlan {
        let plan = index.plan_overwrite(&e).unwrap();
        index.apply(e, &plan).unwrap();
        index.check_invariants().unwrap();
        plan
    }

    // -----------------------------------------------------------------------
    // Basic reads
    // -----------------------------------------------------------------------

    #[test]
    fn empty_index() {
        let index = EntityIndex::new();
        assert!(index.is_empty().unwrap());
        assert!(index.active_pointers(EntityType::Scene).unwrap().is_empty());
        assert!(index
            .entities_by_pointers(EntityType::Scene, &ptrs(&["0,0"]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn first_commit_claims_pointers() {
        let index = EntityIndex::new();
        let a = entity(1, EntityType::Scene, &["0,0", "0,1"]);
        let plan = commit(&index, a.clone());
        assert!(plan.is_fresh_claim());
        assert!(plan.previous.is_empty());
        assert_eq!(
            index.active_pointers(EntityType::Scene).unwrap(),
            ptrs(&["0,0", "0,1"])
        );
        assert_eq!(
            index
                .entities_by_pointers(EntityType::Scene, &ptrs(&["0,0", "0,1"]))
                .unwrap(),
            vec![a]
        );
    }

    #[test]
    fn types_are_separate_namespaces() {
        let index = EntityIndex::new();
        commit(&index, entity(1, EntityType::Scene, &["0,0"]));
        let plan = commit(&index, entity(2, EntityType::Wearable, &["0,0"]));
        assert!(plan.is_fresh_claim());
        assert_eq!(index.len().unwrap(), 2);
    }

    #[test]
    fn entities_by_ids_filters_type_and_dedups() {
        let index = EntityIndex::new();
        let a = entity(1, EntityType::Scene, &["0,0"]);
        commit(&index, a.clone());
        let ids = [a.id, a.id, ContentHash::from_hash([9; 32])];
        assert_eq!(
            index.entities_by_ids(EntityType::Scene, &ids).unwrap(),
            vec![a.clone()]
        );
        assert!(index
            .entities_by_ids(EntityType::Profile, &ids)
            .unwrap()
            .is_empty());
    }

    // -----------------------------------------------------------------------
    // Overwrite
    // -----------------------------------------------------------------------

    #[test]
    fn partial_overwrite_evicts_whole_entity() {
        let index = EntityIndex::new();
        let a = entity(1, EntityType::Scene, &["0,0", "1,1"]);
        commit(&index, a.clone());

        let b = entity(2, EntityType::Scene, &["1,1"]);
        let plan = commit(&index, b.clone());

        assert_eq!(plan.displaced, BTreeSet::from([a.id]));
        assert_eq!(plan.orphan_pointers, BTreeSet::from([ptr("0,0")]));
        assert_eq!(plan.previous.get(&ptr("1,1")), Some(&a.id));

        assert!(index
            .entities_by_pointers(EntityType::Scene, &ptrs(&["0,0"]))
            .unwrap()
            .is_empty());
        assert_eq!(
            index
                .entities_by_pointers(EntityType::Scene, &ptrs(&["1,1"]))
                .unwrap(),
            vec![b]
        );
        assert!(!index.contains(&a.id).unwrap());
        assert_eq!(index.active_pointers(EntityType::Scene).unwrap(), ptrs(&["1,1"]));
    }

    #[test]
    fn overwrite_spanning_several_occupants() {
        let index = EntityIndex::new();
        commit(&index, entity(1, EntityType::Scene, &["0,0", "0,1"]));
        commit(&index, entity(2, EntityType::Scene, &["5,5", "5,6"]));

        let c = entity(3, EntityType::Scene, &["0,1", "5,5", "9,9"]);
        let plan = commit(&index, c);
        assert_eq!(plan.displaced.len(), 2);
        assert_eq!(
            plan.orphan_pointers,
            BTreeSet::from([ptr("0,0"), ptr("5,6")])
        );
        assert_eq!(index.len().unwrap(), 1);
        assert_eq!(
            index.active_pointers(EntityType::Scene).unwrap(),
            ptrs(&["0,1", "5,5", "9,9"])
        );
    }

    #[test]
    fn displaced_once_even_when_hit_by_many_pointers() {
        let index = EntityIndex::new();
        let a = entity(1, EntityType::Scene, &["0,0", "0,1", "0,2"]);
        commit(&index, a.clone());
        let plan = index
            .plan_overwrite(&entity(2, EntityType::Scene, &["0,0", "0,1"]))
            .unwrap();
        assert_eq!(plan.displaced, BTreeSet::from([a.id]));
        assert_eq!(plan.touched_pointers().len(), 3);
    }

    #[test]
    fn footprint_covers_occupant_pointers() {
        let index = EntityIndex::new();
        commit(&index, entity(1, EntityType::Scene, &["0,0", "7,7"]));
        let footprint = index
            .footprint(EntityType::Scene, &ptrs(&["0,0", "3,3"]))
            .unwrap();
        assert_eq!(footprint, BTreeSet::from([ptr("0,0"), ptr("3,3"), ptr("7,7")]));
    }

    #[test]
    fn stale_plan_is_rejected_without_changes() {
        let index = EntityIndex::new();
        let b = entity(2, EntityType::Scene, &["0,0"]);
        let plan = index.plan_overwrite(&b).unwrap();

        commit(&index, entity(1, EntityType::Scene, &["0,0"]));
        let err = index.apply(b, &plan).unwrap_err();
        assert!(matches!(err, IndexError::StalePlan { .. }));
        assert_eq!(index.len().unwrap(), 1);
        index.check_invariants().unwrap();
    }

    // -----------------------------------------------------------------------
    // Restore
    // -----------------------------------------------------------------------

    #[test]
    fn insert_restored_rejects_conflicts() {
        let index = EntityIndex::new();
        index
            .insert_restored(entity(1, EntityType::Scene, &["0,0"]))
            .unwrap();
        let err = index
            .insert_restored(entity(2, EntityType::Scene, &["0,0"]))
            .unwrap_err();
        assert!(matches!(err, IndexError::PointerConflict { .. }));
        index.check_invariants().unwrap();
    }

    #[test]
    fn active_entities_snapshot() {
        let index = EntityIndex::new();
        let a = entity(1, EntityType::Scene, &["0,0"]);
        let p = entity(2, EntityType::Profile, &["0xaa"]);
        commit(&index, a.clone());
        commit(&index, p.clone());
        let tables = index.active_entities().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[&EntityType::Scene][&ptr("0,0")], a.id);
        assert_eq!(tables[&EntityType::Profile][&ptr("0xaa")], p.id);
    }
}
