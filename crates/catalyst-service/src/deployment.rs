use catalyst_crypto::{hash_file, Signature, SigningKey};
use catalyst_types::{
    ContentEntry, DeploymentFile, EntityFile, EntityId, SignerAddress, TypeError, ENTITY_FILE_NAME,
};

/// A signed batch of files, as submitted by a deployer.
#[derive(Clone, Debug)]
pub struct Deployment {
    pub files: Vec<DeploymentFile>,
    pub entity_id: EntityId,
    pub signer: SignerAddress,
    pub signature: Signature,
}

impl Deployment {
    /// Serialize `entity`, sign its id with `key` and bundle it with the
    /// content files.
    pub fn build(
        entity: &EntityFile,
        content: Vec<DeploymentFile>,
        key: &SigningKey,
    ) -> Result<Self, TypeError> {
        let entity_file = DeploymentFile::new(ENTITY_FILE_NAME, entity.to_bytes()?);
        let entity_id = hash_file(&entity_file);
        let mut files = Vec::with_capacity(content.len() + 1);
        files.push(entity_file);
        files.extend(content);
        Ok(Self {
            files,
            entity_id,
            signer: key.address(),
            signature: key.sign_entity(&entity_id),
        })
    }

    /// Total uploaded bytes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.len() as u64).sum()
    }
}

/// Content entries referencing each file by name and hash.
pub fn content_entries(files: &[DeploymentFile]) -> Vec<ContentEntry> {
    files
        .iter()
        .map(|file| ContentEntry::new(file.name.clone(), hash_file(file)))
        .collect()
}
