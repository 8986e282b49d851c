//! The deployment engine.
//!
//! A deployment moves through four phases:
//!
//! 1. **Batch gate** over the raw signed upload.
//! 2. **Entity gate** over the parsed entity, with the locks of every
//!    pointer the commit can touch held.
//! 3. **Storage commit**: content objects, pointer records (with an undo
//!    log), audit proof and history event. All of it is durable before the
//!    in-memory tables change.
//! 4. **Index apply**: one write-locked swap of the pointer tables.
//!
//! A failure in phase 3 or 4 replays the undo log, so the tables never
//! describe state that is not persisted.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use catalyst_crypto::{hash_all, Ed25519Verifier, Signature, SignatureVerifier};
use catalyst_gate::{
    BatchContext, DeploymentGate, EntityContext, RulePolicy, ValidationError, ValidationPolicy,
};
use catalyst_history::{
    AuditInfo, HistoryEvent, HistoryQuery, HistoryStore, StorageHistory,
};
use catalyst_index::{EntityIndex, OverwritePlan, PointerGuard, PointerLocks};
use catalyst_store::{
    ContentStorage, FileSystemContentStorage, InMemoryContentStorage, StorageCategory,
};
use catalyst_types::{
    ContentHash, DeploymentFile, Entity, EntityId, EntityType, MonotonicClock, Pointer,
    SignerAddress, Timestamp,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::commit::{store_contents, PointerCommit};
use crate::config::ServiceConfig;
use crate::deployment::Deployment;
use crate::error::{ServiceError, ServiceResult};
use crate::restore::{restore_index, RestoreReport};

/// Validates signed entity bundles and commits them over the pointer table.
pub struct DeploymentService {
    config: ServiceConfig,
    gate: DeploymentGate,
    storage: Arc<dyn ContentStorage>,
    history: Arc<dyn HistoryStore>,
    index: EntityIndex,
    locks: PointerLocks,
    clock: MonotonicClock,
    /// Shared by commits from timestamp assignment to index apply. Taken
    /// exclusively by snapshots and by audit and history reads, so they
    /// never see a commit that is recorded but not yet applied.
    commits: RwLock<()>,
}

impl DeploymentService {
    /// A service over empty state, with Ed25519 signatures and the
    /// configured rule policy. Nothing is read from `storage`; use
    /// [`Self::open`] to resume persisted state.
    pub fn new(
        config: ServiceConfig,
        storage: Arc<dyn ContentStorage>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let policy = Arc::new(RulePolicy::new(config.policy.clone()));
        Self::with_collaborators(config, storage, history, Arc::new(Ed25519Verifier), policy)
    }

    /// A service with a custom signature verifier and validation policy.
    pub fn with_collaborators(
        config: ServiceConfig,
        storage: Arc<dyn ContentStorage>,
        history: Arc<dyn HistoryStore>,
        verifier: Arc<dyn SignatureVerifier>,
        policy: Arc<dyn ValidationPolicy>,
    ) -> Self {
        let gate = DeploymentGate::with_default_stages(config.gate.clone(), verifier, policy);
        Self {
            config,
            gate,
            storage,
            history,
            index: EntityIndex::new(),
            locks: PointerLocks::new(),
            clock: MonotonicClock::new(),
            commits: RwLock::new(()),
        }
    }

    /// Resume from persisted state: rebuild the index from the pointer
    /// records and move the clock past the newest history event.
    pub async fn open(
        config: ServiceConfig,
        storage: Arc<dyn ContentStorage>,
        history: Arc<dyn HistoryStore>,
    ) -> ServiceResult<Self> {
        let service = Self::new(config, storage, history);
        service.restore().await?;
        Ok(service)
    }

    /// Build storage and history as `config.storage` describes, then
    /// [`Self::open`].
    pub async fn from_config(config: ServiceConfig) -> ServiceResult<Self> {
        let storage: Arc<dyn ContentStorage> = match &config.storage.root {
            Some(root) => Arc::new(FileSystemContentStorage::open(root).await?),
            None => Arc::new(InMemoryContentStorage::new()),
        };
        let history = Arc::new(StorageHistory::load(Arc::clone(&storage)).await?);
        Self::open(config, storage, history).await
    }

    /// [`Self::from_config`] with the configuration read from a TOML file.
    pub async fn from_config_file(path: impl AsRef<Path>) -> ServiceResult<Self> {
        Self::from_config(ServiceConfig::load(path).await?).await
    }

    async fn restore(&self) -> ServiceResult<RestoreReport> {
        let report = restore_index(self.storage.as_ref(), &self.index).await?;
        if let Some(latest) = self.history.latest_timestamp().await? {
            self.clock.observe(latest);
        }
        Ok(report)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn gate(&self) -> &DeploymentGate {
        &self.gate
    }

    // -----------------------------------------------------------------------
    // Deploy
    // -----------------------------------------------------------------------

    /// Deploy a signed batch. See [`Self::deploy_entity`].
    pub async fn deploy(&self, deployment: Deployment) -> ServiceResult<Timestamp> {
        let Deployment {
            files,
            entity_id,
            signer,
            signature,
        } = deployment;
        self.deploy_entity(files, entity_id, signer, signature).await
    }

    /// Validate and commit one entity. Returns the commit timestamp.
    ///
    /// Redeploying an entity that is already live is a no-op that returns
    /// the timestamp of the original commit.
    pub async fn deploy_entity(
        &self,
        files: Vec<DeploymentFile>,
        entity_id: EntityId,
        signer: SignerAddress,
        signature: Signature,
    ) -> ServiceResult<Timestamp> {
        let started = Instant::now();
        self.gate
            .check_batch(&BatchContext {
                entity_id: &entity_id,
                signer: &signer,
                signature: &signature,
                files: &files,
            })
            .into_result()?;

        let (entity_file, content_files) = split_entity_file(files)?;
        let entity = Entity::parse(entity_id, &entity_file.content)
            .map_err(|e| ServiceError::MalformedEntity(e.to_string()))?;
        let uploaded = hash_all(&content_files);
        let uploaded_hashes: BTreeSet<ContentHash> = uploaded.keys().copied().collect();

        let _guard = self.lock_footprint(&entity).await?;

        let occupants = self
            .index
            .entities_by_pointers(entity.entity_type, &entity.pointers)?;
        let stored = self.stored_hashes(&entity, &uploaded_hashes).await?;
        self.gate
            .check_entity(&EntityContext {
                entity: &entity,
                signer: &signer,
                occupants: &occupants,
                uploaded: &uploaded_hashes,
                already_stored: &stored,
            })
            .into_result()?;

        // A live entity without an audit proof is recommitted, which
        // rewrites the missing records.
        if self.index.contains(&entity.id)? {
            if let Some(audit) = self.history.audit_info(entity.entity_type, &entity.id).await? {
                warn!(
                    entity = %entity.id.short_hex(),
                    entity_type = %entity.entity_type,
                    "entity already deployed"
                );
                return Ok(audit.deployed_timestamp);
            }
        }

        let plan = self.index.plan_overwrite(&entity)?;
        let orphan_owners = orphan_owners(&plan, &occupants);

        let mut objects: BTreeMap<ContentHash, Bytes> = uploaded
            .into_iter()
            .filter(|(hash, _)| !stored.contains(hash))
            .map(|(hash, file)| (hash, file.content))
            .collect();
        if !stored.contains(&entity.id) {
            objects.insert(entity.id, entity_file.content);
        }
        store_contents(self.storage.as_ref(), objects).await?;

        let _commit = self.commits.read().await;
        let timestamp = self.clock.next();

        let mut pointers = PointerCommit::new(self.storage.as_ref(), entity.entity_type);
        if let Err(err) = pointers.apply(&plan, &orphan_owners).await {
            pointers.rollback().await;
            return Err(err.into());
        }

        let audit = AuditInfo {
            deployed_timestamp: timestamp,
            signer,
            signature,
        };
        if let Err(err) = self
            .history
            .record_deployment(entity.entity_type, entity.id, audit)
            .await
        {
            pointers.rollback().await;
            return Err(err.into());
        }

        let (entity_type, id, pointer_count) = (entity.entity_type, entity.id, entity.pointers.len());
        if let Err(err) = self.index.apply(entity, &plan) {
            if let Err(undo) = self.history.forget_deployment(entity_type, id, timestamp).await {
                warn!(entity = %id.short_hex(), error = %undo, "failed to remove history records");
            }
            pointers.rollback().await;
            return Err(err.into());
        }

        info!(
            entity = %id.short_hex(),
            %entity_type,
            pointers = pointer_count,
            displaced = plan.displaced.len(),
            orphans = plan.orphan_pointers.len(),
            %timestamp,
            elapsed = ?started.elapsed(),
            "deployment committed"
        );
        Ok(timestamp)
    }

    /// Lock every pointer the commit of `entity` can read or write.
    ///
    /// The footprint depends on the current occupants, which can only be
    /// trusted once their pointers are locked too, so this widens the held
    /// set until it covers the footprint.
    async fn lock_footprint(&self, entity: &Entity) -> ServiceResult<PointerGuard> {
        let mut wanted: BTreeSet<Pointer> = entity.pointers.iter().cloned().collect();
        loop {
            let guard = self
                .locks
                .lock(entity.entity_type, wanted.iter().cloned())
                .await;
            let footprint = self.index.footprint(entity.entity_type, &entity.pointers)?;
            if guard.covers(&footprint) {
                return Ok(guard);
            }
            drop(guard);
            wanted.extend(footprint);
        }
    }

    /// Which of the referenced, uploaded and entity file hashes are
    /// already in storage.
    async fn stored_hashes(
        &self,
        entity: &Entity,
        uploaded: &BTreeSet<ContentHash>,
    ) -> ServiceResult<BTreeSet<ContentHash>> {
        let mut candidates = entity.content_hashes();
        candidates.extend(uploaded.iter().copied());
        candidates.insert(entity.id);
        Ok(self
            .is_content_available(&candidates.into_iter().collect::<Vec<_>>())
            .await?
            .into_iter()
            .filter_map(|(hash, present)| present.then_some(hash))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Entities currently occupying any of `pointers`.
    pub fn entities_by_pointers(
        &self,
        entity_type: EntityType,
        pointers: &[Pointer],
    ) -> ServiceResult<Vec<Entity>> {
        Ok(self.index.entities_by_pointers(entity_type, pointers)?)
    }

    /// Live entities among `ids`.
    pub fn entities_by_ids(
        &self,
        entity_type: EntityType,
        ids: &[EntityId],
    ) -> ServiceResult<Vec<Entity>> {
        Ok(self.index.entities_by_ids(entity_type, ids)?)
    }

    /// Every occupied pointer of `entity_type`, sorted.
    pub fn active_pointers(&self, entity_type: EntityType) -> ServiceResult<Vec<Pointer>> {
        Ok(self.index.active_pointers(entity_type)?)
    }

    pub async fn audit_info(
        &self,
        entity_type: EntityType,
        entity_id: &EntityId,
    ) -> ServiceResult<Option<AuditInfo>> {
        let _settled = self.commits.write().await;
        Ok(self.history.audit_info(entity_type, entity_id).await?)
    }

    pub async fn history(&self, query: &HistoryQuery) -> ServiceResult<Vec<HistoryEvent>> {
        let _settled = self.commits.write().await;
        Ok(self.history.history(query).await?)
    }

    /// Whether each hash is present in content storage.
    pub async fn is_content_available(
        &self,
        hashes: &[ContentHash],
    ) -> ServiceResult<BTreeMap<ContentHash, bool>> {
        let keys: Vec<String> = hashes.iter().map(ContentHash::to_hex).collect();
        let found = self
            .storage
            .exists_batch(StorageCategory::Contents, &keys)
            .await?;
        Ok(hashes
            .iter()
            .map(|hash| (*hash, found.get(&hash.to_hex()).copied().unwrap_or(false)))
            .collect())
    }

    /// The bytes stored under `hash`. An entity id returns its entity file.
    pub async fn content(&self, hash: &ContentHash) -> ServiceResult<Option<Bytes>> {
        Ok(self
            .storage
            .retrieve(StorageCategory::Contents, &hash.to_hex())
            .await?)
    }

    /// Record the current pointer state of every type in the history.
    ///
    /// Waits for in-flight commits, so every deployment event ordered
    /// before the snapshot is part of its state and its delta.
    pub async fn create_snapshot(&self) -> ServiceResult<HistoryEvent> {
        let _settled = self.commits.write().await;
        let active = self.index.active_entities()?;
        let timestamp = self.clock.next();
        Ok(self.history.record_snapshot(timestamp, active).await?)
    }
}

fn split_entity_file(
    files: Vec<DeploymentFile>,
) -> ServiceResult<(DeploymentFile, Vec<DeploymentFile>)> {
    let (mut entity_files, content): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|f| f.is_entity_file());
    match entity_files.len() {
        0 => Err(ValidationError::MissingEntityFile.into()),
        1 => Ok((entity_files.remove(0), content)),
        count => Err(ValidationError::DuplicateEntityFile { count }.into()),
    }
}

/// The displaced entity that held each orphan pointer.
fn orphan_owners(plan: &OverwritePlan, occupants: &[Entity]) -> BTreeMap<Pointer, EntityId> {
    plan.orphan_pointers
        .iter()
        .filter_map(|pointer| {
            occupants
                .iter()
                .find(|occupant| occupant.claims(pointer))
                .map(|occupant| (pointer.clone(), occupant.id))
        })
        .collect()
}
