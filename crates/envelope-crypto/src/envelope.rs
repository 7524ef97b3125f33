//! Envelope encrypt/decrypt engine.
//!
//! Encrypt: fresh CEK + IV → AES-256-CBC(PKCS7) → wrap CEK with KEK → EncryptionData
//! Decrypt: version gate → pick KEK (resolver wins) → key id check → unwrap CEK → decrypt
//!
//! Both directions are pure functions over caller buffers. The CEK exists only
//! inside a `Zeroizing` buffer for the duration of one call.

use zeroize::Zeroizing;

use crate::cbc::{aes_cbc_decrypt, aes_cbc_encrypt};
use crate::cek::{content_key_from_unwrapped, generate_cek, generate_iv};
use crate::error::CryptoError;
use crate::kek::{KeyEncryptionKey, KeyResolver};
use crate::metadata::{EncryptionAgent, EncryptionData, WrappedContentKey};
use crate::types::{AES_CBC_256, SUPPORTED_PROTOCOLS};

/// Ciphertext together with the metadata needed to decrypt it.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub encryption_data: EncryptionData,
}

/// Encrypt `plaintext` under a fresh CEK and wrap the CEK with `kek`.
///
/// The KEK's identity is checked before any cipher work: an empty key id or
/// wrap algorithm yields `KekCapabilityMissing`.
pub fn encrypt(
    plaintext: &[u8],
    kek: &dyn KeyEncryptionKey,
) -> Result<EncryptedPayload, CryptoError> {
    let kid = kek.kid();
    if kid.is_empty() {
        return Err(CryptoError::KekCapabilityMissing("key encryption key reports an empty kid"));
    }
    let algorithm = kek.key_wrap_algorithm();
    if algorithm.is_empty() {
        return Err(CryptoError::KekCapabilityMissing(
            "key encryption key reports an empty key wrap algorithm",
        ));
    }

    let cek = generate_cek()?;
    let iv = generate_iv()?;

    let ciphertext = aes_cbc_encrypt(&cek[..], &iv, plaintext)?;
    let encrypted_key = kek
        .wrap_key(&cek[..])
        .map_err(|e| CryptoError::KeyWrapFailed(e.to_string()))?;
    drop(cek);

    let encryption_data = EncryptionData::new(
        iv,
        EncryptionAgent::v1(),
        WrappedContentKey {
            key_id: kid,
            encrypted_key,
            algorithm,
        },
    );

    Ok(EncryptedPayload {
        ciphertext,
        encryption_data,
    })
}

/// Decrypt `ciphertext` described by `encryption_data`.
///
/// When `resolver` is given, the KEK it returns for the recorded key id is
/// used and `kek` is ignored. Protocol and algorithm are validated before
/// either key object is consulted. All cryptographic failures surface as the
/// single `DecryptionFailure`.
pub fn decrypt(
    ciphertext: &[u8],
    encryption_data: Option<&EncryptionData>,
    kek: Option<&dyn KeyEncryptionKey>,
    resolver: Option<&dyn KeyResolver>,
) -> Result<Vec<u8>, CryptoError> {
    let data = encryption_data.ok_or(CryptoError::MissingEncryptionMetadata)?;
    validate_agent(&data.encryption_agent)?;

    let wrapped = &data.wrapped_content_key;
    let resolved;
    let effective: &dyn KeyEncryptionKey = match resolver {
        Some(resolver) => {
            resolved = resolver
                .resolve(&wrapped.key_id)
                .ok_or_else(|| CryptoError::KeyNotResolved(wrapped.key_id.clone()))?;
            resolved.as_ref()
        }
        None => kek.ok_or(CryptoError::KekCapabilityMissing(
            "no key encryption key or key resolver supplied",
        ))?,
    };

    let actual = effective.kid();
    if actual != wrapped.key_id {
        return Err(CryptoError::KekIdMismatch {
            expected: wrapped.key_id.clone(),
            actual,
        });
    }

    let unwrapped = effective
        .unwrap_key(&wrapped.encrypted_key, &wrapped.algorithm)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailure)?;
    let cek = content_key_from_unwrapped(unwrapped)?;

    aes_cbc_decrypt(&cek[..], &data.content_encryption_iv, ciphertext)
}

fn validate_agent(agent: &EncryptionAgent) -> Result<(), CryptoError> {
    if !SUPPORTED_PROTOCOLS.contains(&agent.protocol.as_str()) {
        return Err(CryptoError::UnsupportedEncryptionVersion(
            agent.protocol.clone(),
        ));
    }
    if agent.encryption_algorithm != AES_CBC_256 {
        return Err(CryptoError::UnsupportedEncryptionAlgorithm(
            agent.encryption_algorithm.clone(),
        ));
    }
    Ok(())
}
