//! AES-256-CBC with PKCS7 padding for envelope payloads.
//!
//! Ciphertext layout: padded plaintext encrypted block by block, no IV prefix
//! and no version byte. IV and key travel separately in `EncryptionData`.
//! A plaintext whose length is already a multiple of 16 gains one full
//! padding block, so the ciphertext is never empty.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::CryptoError;
use crate::types::{AES_BLOCK_SIZE, CEK_LENGTH, IV_LENGTH};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Ciphertext length produced for a plaintext of `plaintext_len` bytes.
pub fn padded_len(plaintext_len: usize) -> usize {
    (plaintext_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
}

/// Encrypt `plaintext` with AES-256-CBC under (`key`, `iv`), PKCS7 padded.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != CEK_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: CEK_LENGTH,
            got: key.len(),
        });
    }
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt AES-256-CBC `ciphertext` under (`key`, `iv`) and strip PKCS7 padding.
///
/// Every failure (wrong key or IV size, misaligned input, bad padding) maps to
/// `DecryptionFailure`.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != CEK_LENGTH || iv.len() != IV_LENGTH {
        return Err(CryptoError::DecryptionFailure);
    }
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::DecryptionFailure);
    }
    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CryptoError::DecryptionFailure)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailure)
}
