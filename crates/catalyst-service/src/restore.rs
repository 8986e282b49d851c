//! Rebuilding the entity index from persisted pointer records.
//!
//! An entity is restored only if every pointer it declares maps back to it
//! in storage. Anything else is the residue of an interrupted commit and
//! its pointer records are deleted.

use std::collections::BTreeMap;

use catalyst_index::EntityIndex;
use catalyst_store::{ContentStorage, StorageCategory};
use catalyst_types::{Entity, EntityId, EntityType, Pointer};
use tracing::{info, warn};

use crate::error::ServiceResult;

/// What a restore found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub entities: usize,
    pub pointers: usize,
    /// Pointer records deleted because they did not describe a live entity.
    pub stale_pointers: usize,
}

pub(crate) async fn restore_index(
    storage: &dyn ContentStorage,
    index: &EntityIndex,
) -> ServiceResult<RestoreReport> {
    let mut report = RestoreReport::default();
    for entity_type in EntityType::ALL {
        restore_type(storage, index, entity_type, &mut report).await?;
    }
    info!(
        entities = report.entities,
        pointers = report.pointers,
        stale = report.stale_pointers,
        "index restored"
    );
    Ok(report)
}

async fn restore_type(
    storage: &dyn ContentStorage,
    index: &EntityIndex,
    entity_type: EntityType,
    report: &mut RestoreReport,
) -> ServiceResult<()> {
    let category = StorageCategory::Pointers(entity_type);

    let mut owners: BTreeMap<Pointer, EntityId> = BTreeMap::new();
    let mut stale: Vec<String> = Vec::new();
    for key in storage.list(category).await? {
        match read_pointer_record(storage, category, &key).await? {
            Some((pointer, id)) if pointer.as_str() == key => {
                owners.insert(pointer, id);
            }
            _ => stale.push(key),
        }
    }

    let mut by_owner: BTreeMap<EntityId, Vec<Pointer>> = BTreeMap::new();
    for (pointer, id) in &owners {
        by_owner.entry(*id).or_default().push(pointer.clone());
    }

    for (id, recorded) in by_owner {
        match load_entity(storage, &id).await? {
            Some(entity)
                if entity.entity_type == entity_type
                    && entity.pointers.iter().all(|p| owners.get(p) == Some(&id)) =>
            {
                report.pointers += entity.pointers.len();
                report.entities += 1;
                index.insert_restored(entity)?;
            }
            _ => stale.extend(recorded.into_iter().map(String::from)),
        }
    }

    for key in stale {
        warn!(%entity_type, pointer = %key, "deleting stale pointer record");
        storage.delete(category, &key).await?;
        report.stale_pointers += 1;
    }
    Ok(())
}

async fn read_pointer_record(
    storage: &dyn ContentStorage,
    category: StorageCategory,
    key: &str,
) -> ServiceResult<Option<(Pointer, EntityId)>> {
    let Some(bytes) = storage.retrieve(category, key).await? else {
        return Ok(None);
    };
    let Ok(pointer) = Pointer::new(key) else {
        return Ok(None);
    };
    let id = std::str::from_utf8(&bytes)
        .ok()
        .and_then(|hex| EntityId::from_hex(hex).ok());
    Ok(id.map(|id| (pointer, id)))
}

async fn load_entity(storage: &dyn ContentStorage, id: &EntityId) -> ServiceResult<Option<Entity>> {
    let Some(bytes) = storage
        .retrieve(StorageCategory::Contents, &id.to_hex())
        .await?
    else {
        return Ok(None);
    };
    Ok(Entity::parse(*id, &bytes).ok())
}
