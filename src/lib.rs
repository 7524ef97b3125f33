//! Object and queue clients with client-side envelope encryption.
//!
//! Payloads are encrypted before they reach an `ObjectTransport` or
//! `QueueTransport` and decrypted after they come back, using the engine in
//! the `envelope-crypto` crate. An `EncryptionPolicy` shared by the clients
//! decides whether writes are encrypted and whether plaintext is tolerated.

pub mod config;
pub mod error;
pub mod memory;
pub mod object;
pub mod queue;
pub mod transport;

pub use config::ClientOptions;
pub use error::{Result, StorageError};
pub use memory::MemoryTransport;
pub use object::{DownloadedObject, ObjectClient};
pub use queue::{EncryptedMessage, QueueClient};
pub use transport::{
    ObjectTransport, QueueMessage, QueueTransport, StoredObject, TransportError,
    TransportErrorKind,
};

pub use envelope_crypto::{
    AesKeyWrapper, CryptoError, EncryptionData, EncryptionPolicy, KeyEncryptionKey, KeyResolver,
    LocalKeyResolver,
};
