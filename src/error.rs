use envelope_crypto::CryptoError;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Encryption error: {0}")]
    Encryption(#[from] CryptoError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// The encryption error behind this failure, if any.
    pub fn encryption_error(&self) -> Option<&CryptoError> {
        match self {
            StorageError::Encryption(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
