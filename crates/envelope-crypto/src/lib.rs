//! Client-side envelope encryption for storage payloads.
//!
//! Each payload is encrypted with a fresh AES-256 content key (CEK) in CBC
//! mode. The CEK is wrapped by a caller-supplied key-encryption key (KEK) and
//! recorded, with the IV and protocol version, in `EncryptionData`.

pub mod base64;
pub mod cbc;
pub mod cek;
pub mod envelope;
pub mod error;
pub mod kek;
pub mod metadata;
pub mod policy;
pub mod types;


pub use base64::{base64_decode, base64_encode};
pub use envelope::{decrypt, encrypt, EncryptedPayload};
pub use error::CryptoError;
pub use kek::{AesKeyWrapper, KeyEncryptionKey, KeyResolver, KeyWrapError, LocalKeyResolver};
pub use metadata::{check_protocol, EncryptionAgent, EncryptionData, WrappedContentKey};
pub use policy::EncryptionPolicy;
pub use types::{
    A256KW, AES_CBC_256, CEK_LENGTH, ENCRYPTION_DATA_METADATA_KEY, ENCRYPTION_MODE_FULL_BLOB,
    ENCRYPTION_PROTOCOL_V1, IV_LENGTH, SUPPORTED_PROTOCOLS,
};
