use catalyst_gate::ValidationError;
use catalyst_history::HistoryError;
use catalyst_index::IndexError;
use catalyst_store::StorageError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// The flat failure kind, for callers that report failures without
    /// matching nested errors.
    pub fn kind(&self) -> FailureKind {
        match self {
            ServiceError::Validation(e) => match e {
                ValidationError::InvalidSignature { .. } => FailureKind::InvalidSignature,
                ValidationError::PayloadTooLarge { .. } => FailureKind::PayloadTooLarge,
                ValidationError::MissingEntityFile => FailureKind::MissingEntityFile,
                ValidationError::DuplicateEntityFile { .. } => FailureKind::DuplicateEntityFile,
                ValidationError::EntityIdMismatch { .. } => FailureKind::EntityIdMismatch,
                ValidationError::AccessDenied { .. } => FailureKind::AccessDenied,
                ValidationError::DeploymentIsNotFresh { .. } => FailureKind::DeploymentIsNotFresh,
                ValidationError::InvalidEntity(_) => FailureKind::InvalidEntity,
                ValidationError::MissingContent { .. } => FailureKind::MissingContent,
            },
            ServiceError::MalformedEntity(_) => FailureKind::MalformedEntity,
            ServiceError::StorageFailure(_) => FailureKind::StorageFailure,
            ServiceError::History(HistoryError::Storage(_)) => FailureKind::StorageFailure,
            ServiceError::History(_) | ServiceError::Index(_) | ServiceError::Config(_) => {
                FailureKind::Internal
            }
        }
    }
}

/// Why a deployment or query failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidSignature,
    PayloadTooLarge,
    EntityIdMismatch,
    AccessDenied,
    DeploymentIsNotFresh,
    InvalidEntity,
    MissingContent,
    MissingEntityFile,
    DuplicateEntityFile,
    MalformedEntity,
    StorageFailure,
    /// Lock poisoning or corrupted persisted state.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidSignature => "invalid_signature",
            FailureKind::PayloadTooLarge => "payload_too_large",
            FailureKind::EntityIdMismatch => "entity_id_mismatch",
            FailureKind::AccessDenied => "access_denied",
            FailureKind::DeploymentIsNotFresh => "deployment_is_not_fresh",
            FailureKind::InvalidEntity => "invalid_entity",
            FailureKind::MissingContent => "missing_content",
            FailureKind::MissingEntityFile => "missing_entity_file",
            FailureKind::DuplicateEntityFile => "duplicate_entity_file",
            FailureKind::MalformedEntity => "malformed_entity",
            FailureKind::StorageFailure => "storage_failure",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_kinds() {
        let err = ServiceError::from(ValidationError::MissingEntityFile);
        assert_eq!(err.kind(), FailureKind::MissingEntityFile);
        let err = ServiceError::from(ValidationError::DuplicateEntityFile { count: 2 });
        assert_eq!(err.kind(), FailureKind::DuplicateEntityFile);
    }

    #[test]
    fn storage_kinds() {
        let err = ServiceError::from(StorageError::Backend("down".into()));
        assert_eq!(err.kind(), FailureKind::StorageFailure);
        let err = ServiceError::from(HistoryError::Storage(StorageError::Backend("down".into())));
        assert_eq!(err.kind(), FailureKind::StorageFailure);
    }

    #[test]
    fn internal_kinds() {
        let err = ServiceError::from(IndexError::LockPoisoned("x".into()));
        assert_eq!(err.kind(), FailureKind::Internal);
        assert_eq!(err.kind().to_string(), "internal");
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&FailureKind::DeploymentIsNotFresh).unwrap();
        assert_eq!(json, "\"deployment_is_not_fresh\"");
    }
}
