//! Standard (padded) base64 as used by the envelope wire metadata.

use base64ct::{Base64, Encoding};

/// Base64 encode bytes with the standard alphabet and padding.
pub fn base64_encode(data: &[u8]) -> String {
    Base64::encode_string(data)
}

/// Base64 decode a padded standard-alphabet string to bytes.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, base64ct::Error> {
    Base64::decode_vec(s)
}

/// Serde adapter for `Vec<u8>` fields carried as base64 strings.
pub(crate) mod serde_bytes_b64 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::base64_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::base64_decode(&s).map_err(|e| D::Error::custom(format!("invalid base64: {e}")))
    }
}

/// Serde adapter for the fixed-size content encryption IV.
pub(crate) mod serde_iv_b64 {
    use crate::types::IV_LENGTH;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        iv: &[u8; IV_LENGTH],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::base64_encode(iv))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; IV_LENGTH], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = super::base64_decode(&s)
            .map_err(|e| D::Error::custom(format!("invalid base64: {e}")))?;
        let len = bytes.len();
        bytes.try_into().map_err(|_| {
            D::Error::custom(format!(
                "ContentEncryptionIV must be {IV_LENGTH} bytes, got {len}"
            ))
        })
    }
}
