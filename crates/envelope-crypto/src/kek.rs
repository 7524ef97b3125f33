//! Key-encryption-key capabilities supplied by the caller.
//!
//! The engine never holds KEK material. It only asks a `KeyEncryptionKey` to
//! wrap a fresh CEK on encrypt and to unwrap it on decrypt, and asks a
//! `KeyResolver` to find the right KEK for a recorded key id.
//!
//! `AesKeyWrapper` and `LocalKeyResolver` are local implementations backed by
//! AES-KW, usable directly or as templates for KMS/HSM-backed ones.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use aes_kw::KekAes256;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::types::{A256KW, CEK_LENGTH};

/// Error type returned by caller-supplied key wrap implementations.
pub type KeyWrapError = Box<dyn std::error::Error + Send + Sync>;

/// A caller-managed key that protects content encryption keys.
///
/// Implementations are called from whatever thread performs the transfer, so
/// they must be safe for concurrent use.
pub trait KeyEncryptionKey: Send + Sync {
    /// Wrap `key` with the algorithm reported by `key_wrap_algorithm`.
    fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>, KeyWrapError>;

    /// Unwrap `wrapped` using the algorithm named in the stored metadata.
    fn unwrap_key(&self, wrapped: &[u8], algorithm: &str) -> Result<Vec<u8>, KeyWrapError>;

    /// Identifier of the wrap algorithm, recorded as `WrappedContentKey.Algorithm`.
    fn key_wrap_algorithm(&self) -> String;

    /// Identifier of this key, recorded as `WrappedContentKey.KeyId`.
    fn kid(&self) -> String;
}

/// Maps a key id recorded in `EncryptionData` to the KEK able to unwrap it.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, kid: &str) -> Option<Arc<dyn KeyEncryptionKey>>;
}

impl<F> KeyResolver for F
where
    F: Fn(&str) -> Option<Arc<dyn KeyEncryptionKey>> + Send + Sync,
{
    fn resolve(&self, kid: &str) -> Option<Arc<dyn KeyEncryptionKey>> {
        self(kid)
    }
}

// ============================================================================
// AesKeyWrapper: local AES-KW key encryption key
// ============================================================================

/// AES-KW (RFC 3394) key encryption key held in process memory.
pub struct AesKeyWrapper {
    kid: String,
    key: Zeroizing<[u8; CEK_LENGTH]>,
}

impl AesKeyWrapper {
    /// Create a wrapper over a 32-byte key.
    pub fn new(kid: impl Into<String>, key: [u8; CEK_LENGTH]) -> Self {
        Self {
            kid: kid.into(),
            key: Zeroizing::new(key),
        }
    }

    /// Create a wrapper from a key slice, checking its length.
    pub fn from_slice(kid: impl Into<String>, key: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; CEK_LENGTH] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: CEK_LENGTH,
            got: key.len(),
        })?;
        Ok(Self::new(kid, key))
    }

    /// Create a wrapper over a freshly generated random key.
    pub fn generate(kid: impl Into<String>) -> Result<Self, CryptoError> {
        let mut key = Zeroizing::new([0u8; CEK_LENGTH]);
        getrandom::getrandom(&mut key[..]).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
        Ok(Self::new(kid, *key))
    }

    fn cipher(&self) -> KekAes256 {
        KekAes256::from(*self.key)
    }
}

impl fmt::Debug for AesKeyWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesKeyWrapper")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl KeyEncryptionKey for AesKeyWrapper {
    fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
        // AES-KW takes whole 64-bit semiblocks, at least two of them
        if key.len() < 16 || key.len() % 8 != 0 {
            return Err(CryptoError::KeyWrapFailed(format!(
                "AES-KW input must be a multiple of 8 bytes and at least 16, got {}",
                key.len()
            ))
            .into());
        }
        let mut wrapped = vec![0u8; key.len() + 8];
        self.cipher()
            .wrap(key, &mut wrapped)
            .map_err(|e| CryptoError::KeyWrapFailed(format!("{:?}", e)))?;
        Ok(wrapped)
    }

    fn unwrap_key(&self, wrapped: &[u8], algorithm: &str) -> Result<Vec<u8>, KeyWrapError> {
        if algorithm != A256KW {
            return Err(CryptoError::UnknownKeyWrapAlgorithm(algorithm.to_string()).into());
        }
        if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
            return Err(CryptoError::KeyWrapFailed(format!(
                "invalid AES-KW ciphertext length {}",
                wrapped.len()
            ))
            .into());
        }
        let mut key = vec![0u8; wrapped.len() - 8];
        self.cipher()
            .unwrap(wrapped, &mut key)
            .map_err(|e| CryptoError::KeyWrapFailed(format!("{:?}", e)))?;
        Ok(key)
    }

    fn key_wrap_algorithm(&self) -> String {
        A256KW.to_string()
    }

    fn kid(&self) -> String {
        self.kid.clone()
    }
}

// ============================================================================
// LocalKeyResolver: in-memory kid → KEK map
// ============================================================================

/// Resolver backed by an in-memory map of key id to KEK.
#[derive(Default, Clone)]
pub struct LocalKeyResolver {
    keys: HashMap<String, Arc<dyn KeyEncryptionKey>>,
}

impl LocalKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key under the id it reports. Replaces any key with the same id.
    pub fn put_key(&mut self, key: Arc<dyn KeyEncryptionKey>) {
        self.keys.insert(key.kid(), key);
    }

    pub fn with_key(mut self, key: Arc<dyn KeyEncryptionKey>) -> Self {
        self.put_key(key);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for LocalKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&String> = self.keys.keys().collect();
        kids.sort();
        f.debug_struct("LocalKeyResolver").field("kids", &kids).finish()
    }
}

impl KeyResolver for LocalKeyResolver {
    fn resolve(&self, kid: &str) -> Option<Arc<dyn KeyEncryptionKey>> {
        self.keys.get(kid).cloned()
    }
}
