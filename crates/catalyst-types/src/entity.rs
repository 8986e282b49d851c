use std::collections::BTreeSet;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::{ContentHash, EntityId};
use crate::pointer::{EntityType, Pointer};
use crate::timestamp::Timestamp;

/// Name of the canonical entity file inside a deployment batch.
pub const ENTITY_FILE_NAME: &str = "entity.json";

/// A reference from an entity to one of its content files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentEntry {
    /// Path of the file as the deployer named it.
    pub file: String,
    /// Content address of the file bytes.
    pub hash: ContentHash,
}

impl ContentEntry {
    pub fn new(file: impl Into<String>, hash: ContentHash) -> Self {
        Self {
            file: file.into(),
            hash,
        }
    }
}

/// The serialized form of an entity, as carried in `entity.json`.
///
/// The entity id is the content hash of this file's exact bytes, so the
/// id is not part of the document. Parsing is strict: unknown fields,
/// unknown types, empty pointers and malformed hashes are all rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityFile {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub pointers: Vec<Pointer>,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub content: Vec<ContentEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl EntityFile {
    /// Parse an entity file from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::MalformedEntity(e.to_string()))
    }

    /// Serialize to the bytes a deployer would upload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// A deployed entity: the parsed entity file bound to its id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub pointers: Vec<Pointer>,
    pub timestamp: Timestamp,
    pub content: Vec<ContentEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Entity {
    /// Bind a parsed entity file to the id computed over its bytes.
    pub fn from_file(id: EntityId, file: EntityFile) -> Self {
        Self {
            id,
            entity_type: file.entity_type,
            pointers: file.pointers,
            timestamp: file.timestamp,
            content: file.content,
            metadata: file.metadata,
        }
    }

    /// Parse the bytes of an entity file and bind them to `id`.
    pub fn parse(id: EntityId, bytes: &[u8]) -> Result<Self, TypeError> {
        EntityFile::parse(bytes).map(|file| Self::from_file(id, file))
    }

    /// The distinct content hashes this entity references.
    pub fn content_hashes(&self) -> BTreeSet<ContentHash> {
        self.content.iter().map(|entry| entry.hash).collect()
    }

    /// Returns `true` if this entity claims `pointer`.
    pub fn claims(&self, pointer: &Pointer) -> bool {
        self.pointers.contains(pointer)
    }
}

/// A named byte blob submitted in a deployment batch.
#[derive(Clone, PartialEq, Eq)]
pub struct DeploymentFile {
    pub name: String,
    pub content: Bytes,
}

impl DeploymentFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Returns `true` if this is the canonical entity file.
    pub fn is_entity_file(&self) -> bool {
        self.name == ENTITY_FILE_NAME
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl std::fmt::Debug for DeploymentFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentFile")
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}
