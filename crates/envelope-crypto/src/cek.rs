//! Per-payload Content Encryption Key (CEK) and IV generation.
//!
//! Each payload gets a random 256-bit CEK and a random 128-bit IV. The CEK
//! only ever lives inside a `Zeroizing` buffer and is wiped when the encrypt
//! or decrypt call that owns it returns.

use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::types::{CEK_LENGTH, IV_LENGTH};

/// A content encryption key that is wiped on drop.
pub type ContentKey = Zeroizing<[u8; CEK_LENGTH]>;

/// Generate a random 256-bit Content Encryption Key.
pub fn generate_cek() -> Result<ContentKey, CryptoError> {
    let mut cek = Zeroizing::new([0u8; CEK_LENGTH]);
    getrandom::getrandom(&mut cek[..]).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(cek)
}

/// Generate a random 16-byte IV for AES-CBC.
pub fn generate_iv() -> Result<[u8; IV_LENGTH], CryptoError> {
    let mut iv = [0u8; IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(iv)
}

/// Copy an unwrapped key into a `ContentKey`. The source is wiped when dropped.
///
/// Any length other than 32 bytes is reported as a decryption failure.
pub(crate) fn content_key_from_unwrapped(
    unwrapped: Zeroizing<Vec<u8>>,
) -> Result<ContentKey, CryptoError> {
    if unwrapped.len() != CEK_LENGTH {
        return Err(CryptoError::DecryptionFailure);
    }
    let mut cek = Zeroizing::new([0u8; CEK_LENGTH]);
    cek.copy_from_slice(&unwrapped);
    Ok(cek)
}
