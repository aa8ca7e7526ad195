//! Storage error taxonomy shared by message stores and webhook registries

/// Error returned by every storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl StoreError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        StoreError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        StoreError::Io {
            message: message.into(),
        }
    }

    pub(crate) fn closed() -> Self {
        StoreError::io("store is closed")
    }

    pub(crate) fn poisoned() -> Self {
        StoreError::io("store lock poisoned")
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::io(e.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::io(format!("sqlite: {}", e))
    }
}

impl From<rusqlite_migration::Error> for StoreError {
    fn from(e: rusqlite_migration::Error) -> Self {
        StoreError::io(format!("migration: {}", e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::io(format!("serialization: {}", e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
