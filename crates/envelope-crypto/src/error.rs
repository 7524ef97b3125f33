use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key encryption key is unusable: {0}")]
    KekCapabilityMissing(&'static str),

    #[error("Unsupported encryption version: {0}")]
    UnsupportedEncryptionVersion(String),

    #[error("Unsupported encryption algorithm: {0}")]
    UnsupportedEncryptionAlgorithm(String),

    #[error("Key encryption key id mismatch: metadata names {expected}, key reports {actual}")]
    KekIdMismatch { expected: String, actual: String },

    #[error("Key resolver returned no key for id {0}")]
    KeyNotResolved(String),

    /// Deliberately carries no detail about which step failed.
    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Encryption metadata is missing")]
    MissingEncryptionMetadata,

    #[error("Encryption is required but the payload is not encrypted")]
    MessageNotEncrypted,

    #[error("Encryption is required but no key encryption key is configured")]
    EncryptionRequiredViolation,

    #[error("Operation {0} is not supported when encryption is configured")]
    UnsupportedOperationForEncryption(&'static str),

    #[error("Invalid encryption data: {0}")]
    InvalidEncryptionData(String),

    #[error("Key wrap failed: {0}")]
    KeyWrapFailed(String),

    #[error("Unknown key wrap algorithm: {0}")]
    UnknownKeyWrapAlgorithm(String),

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}
