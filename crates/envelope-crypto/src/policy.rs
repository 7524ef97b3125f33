//! `require_encryption` enforcement at object and message integration points.
//!
//! An `EncryptionPolicy` is built once, then shared read-only (typically
//! behind an `Arc`) by every client that reads or writes through it.
//!
//! Write: require_encryption && no KEK → EncryptionRequiredViolation (before any I/O)
//! Read:  no metadata → MessageNotEncrypted if required, else plaintext pass-through
//!        metadata    → engine decrypt with the configured KEK / resolver

use std::fmt;
use std::sync::Arc;

use crate::envelope::{decrypt, encrypt};
use crate::error::CryptoError;
use crate::kek::{KeyEncryptionKey, KeyResolver};
use crate::metadata::EncryptionData;

/// Client-side encryption configuration for one client instance.
#[derive(Clone, Default)]
pub struct EncryptionPolicy {
    key_encryption_key: Option<Arc<dyn KeyEncryptionKey>>,
    key_resolver: Option<Arc<dyn KeyResolver>>,
    require_encryption: bool,
}

impl EncryptionPolicy {
    /// A policy that neither encrypts nor requires encryption.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt writes with `kek` and use it for reads when no resolver is set.
    pub fn with_key_encryption_key(mut self, kek: Arc<dyn KeyEncryptionKey>) -> Self {
        self.key_encryption_key = Some(kek);
        self
    }

    /// Resolve read-side KEKs by key id. Takes precedence over the direct KEK.
    pub fn with_key_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.key_resolver = Some(resolver);
        self
    }

    /// Reject plaintext reads and unencrypted writes.
    pub fn require_encryption(mut self, required: bool) -> Self {
        self.require_encryption = required;
        self
    }

    pub fn key_encryption_key(&self) -> Option<&Arc<dyn KeyEncryptionKey>> {
        self.key_encryption_key.as_ref()
    }

    pub fn key_resolver(&self) -> Option<&Arc<dyn KeyResolver>> {
        self.key_resolver.as_ref()
    }

    pub fn is_encryption_required(&self) -> bool {
        self.require_encryption
    }

    /// Whether writes through this policy are encrypted.
    pub fn encrypts_writes(&self) -> bool {
        self.key_encryption_key.is_some()
    }

    /// Whether reads can unwrap content keys at all.
    ///
    /// Clients without a key source hand encrypted payloads back untouched.
    pub fn has_key_source(&self) -> bool {
        self.key_encryption_key.is_some() || self.key_resolver.is_some()
    }

    /// Fail fast when encryption is required but no KEK is configured.
    pub fn check_write(&self) -> Result<(), CryptoError> {
        if self.require_encryption && self.key_encryption_key.is_none() {
            return Err(CryptoError::EncryptionRequiredViolation);
        }
        Ok(())
    }

    /// Fail fast when encryption is required but nothing could unwrap a key.
    pub fn check_read_capable(&self) -> Result<(), CryptoError> {
        if self.require_encryption && !self.has_key_source() {
            return Err(CryptoError::KekCapabilityMissing(
                "encryption is required but no key encryption key or key resolver is configured",
            ));
        }
        Ok(())
    }

    /// Reject operations that write part of an object when writes are encrypted.
    pub fn check_whole_object_write(&self, operation: &'static str) -> Result<(), CryptoError> {
        self.check_write()?;
        if self.encrypts_writes() {
            return Err(CryptoError::UnsupportedOperationForEncryption(operation));
        }
        Ok(())
    }

    /// Encrypt `payload` for upload, or pass it through when no KEK is configured.
    pub fn encrypt_for_write(
        &self,
        payload: &[u8],
    ) -> Result<(Vec<u8>, Option<EncryptionData>), CryptoError> {
        self.check_write()?;
        match &self.key_encryption_key {
            Some(kek) => {
                let encrypted = encrypt(payload, kek.as_ref())?;
                Ok((encrypted.ciphertext, Some(encrypted.encryption_data)))
            }
            None => Ok((payload.to_vec(), None)),
        }
    }

    /// Recover the plaintext of a downloaded payload.
    pub fn decrypt_for_read(
        &self,
        payload: Vec<u8>,
        encryption_data: Option<&EncryptionData>,
    ) -> Result<Vec<u8>, CryptoError> {
        match encryption_data {
            None if self.require_encryption => Err(CryptoError::MessageNotEncrypted),
            None => Ok(payload),
            Some(data) => decrypt(
                &payload,
                Some(data),
                self.key_encryption_key.as_deref(),
                self.key_resolver.as_deref(),
            ),
        }
    }
}

impl fmt::Debug for EncryptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionPolicy")
            .field(
                "key_encryption_key",
                &self.key_encryption_key.as_ref().map(|k| k.kid()),
            )
            .field("key_resolver", &self.key_resolver.is_some())
            .field("require_encryption", &self.require_encryption)
            .finish()
    }
}
