use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotAuthorized,
    Validation,
    Conflict,
    StorageFailure,
}

/// Which capability a denied caller was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("image `{0}` not found")]
    ImageNotFound(Uuid),
    #[error("version `{version}` not found for image `{image}`")]
    VersionNotFound { image: Uuid, version: Uuid },
    #[error("not authorized to {0} this image")]
    NotAuthorized(Access),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("version conflict: expected parent `{expected}` is no longer current")]
    Conflict {
        expected: Uuid,
        current: Option<Uuid>,
    },
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::ImageNotFound(_) | ServiceError::VersionNotFound { .. } => {
                ErrorKind::NotFound
            }
            ServiceError::NotAuthorized(_) => ErrorKind::NotAuthorized,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Conflict { .. } => ErrorKind::Conflict,
            ServiceError::Storage(_) | ServiceError::Serialization(_) => ErrorKind::StorageFailure,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
