//! Client configuration.

/// Options shared by the object and queue clients.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Recorded as `KeyWrappingMetadata.EncryptionLibrary` on encrypted objects.
    pub encryption_library: String,
    /// Payloads at least this large are encrypted/decrypted on the blocking pool.
    pub blocking_threshold: usize,
}

/// Library identifier written into object envelopes by default.
pub const DEFAULT_ENCRYPTION_LIBRARY: &str =
    concat!("Rust envelope-storage ", env!("CARGO_PKG_VERSION"));

/// Default size above which cipher work moves off the async worker (1 MiB).
pub const DEFAULT_BLOCKING_THRESHOLD: usize = 1024 * 1024;

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            encryption_library: DEFAULT_ENCRYPTION_LIBRARY.to_string(),
            blocking_threshold: DEFAULT_BLOCKING_THRESHOLD,
        }
    }
}
