/// Envelope protocol version written into every `EncryptionAgent`.
///
/// Version 1.0: AES-256-CBC payload with PKCS7 padding, fresh CEK and IV per
/// payload, CEK wrapped by a caller-supplied key-encryption key.
pub const ENCRYPTION_PROTOCOL_V1: &str = "1.0";

/// Protocol versions this crate can decrypt.
pub const SUPPORTED_PROTOCOLS: &[&str] = &[ENCRYPTION_PROTOCOL_V1];

/// Payload cipher identifier recorded in `EncryptionAgent.EncryptionAlgorithm`.
pub const AES_CBC_256: &str = "AES_CBC_256";

/// Key-wrap algorithm identifier used by `AesKeyWrapper` (RFC 3394 with a 256-bit KEK).
pub const A256KW: &str = "A256KW";

/// Content encryption key length in bytes (256 bits).
pub const CEK_LENGTH: usize = 32;

/// AES-CBC IV length in bytes.
pub const IV_LENGTH: usize = 16;

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Object metadata key carrying the serialized `EncryptionData`.
pub const ENCRYPTION_DATA_METADATA_KEY: &str = "encryptiondata";

/// `EncryptionMode` value for objects encrypted as a single unit.
pub const ENCRYPTION_MODE_FULL_BLOB: &str = "FullBlob";

/// Key in `KeyWrappingMetadata` naming the library that produced the envelope.
pub const ENCRYPTION_LIBRARY_KEY: &str = "EncryptionLibrary";
