//! Versioned record of how a payload was protected.
//!
//! Wire form (JSON, PascalCase keys, standard padded base64):
//!
//! ```text
//! {
//!   "WrappedContentKey": { "KeyId": "...", "EncryptedKey": "<b64>", "Algorithm": "A256KW" },
//!   "EncryptionAgent": { "Protocol": "1.0", "EncryptionAlgorithm": "AES_CBC_256" },
//!   "ContentEncryptionIV": "<b64, 16 bytes>",
//!   "EncryptionMode": "FullBlob",                          // objects only
//!   "KeyWrappingMetadata": { "EncryptionLibrary": "..." }  // optional
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::types::{
    AES_CBC_256, ENCRYPTION_LIBRARY_KEY, ENCRYPTION_MODE_FULL_BLOB, ENCRYPTION_PROTOCOL_V1,
    IV_LENGTH, SUPPORTED_PROTOCOLS,
};

/// The CEK after wrapping by a KEK, plus the id of the KEK that can unwrap it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WrappedContentKey {
    pub key_id: String,
    #[serde(with = "crate::base64::serde_bytes_b64")]
    pub encrypted_key: Vec<u8>,
    pub algorithm: String,
}

/// Envelope protocol version and payload cipher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionAgent {
    pub protocol: String,
    pub encryption_algorithm: String,
}

impl EncryptionAgent {
    /// Agent written by this crate: protocol 1.0, AES-256-CBC.
    pub fn v1() -> Self {
        Self {
            protocol: ENCRYPTION_PROTOCOL_V1.to_string(),
            encryption_algorithm: AES_CBC_256.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionData {
    #[serde(rename = "WrappedContentKey")]
    pub wrapped_content_key: WrappedContentKey,

    #[serde(rename = "EncryptionAgent")]
    pub encryption_agent: EncryptionAgent,

    #[serde(rename = "ContentEncryptionIV", with = "crate::base64::serde_iv_b64")]
    pub content_encryption_iv: [u8; IV_LENGTH],

    /// Present on whole-object envelopes; queue messages omit it.
    #[serde(
        rename = "EncryptionMode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub encryption_mode: Option<String>,

    #[serde(
        rename = "KeyWrappingMetadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub key_wrapping_metadata: Option<BTreeMap<String, String>>,
}

impl EncryptionData {
    pub fn new(
        content_encryption_iv: [u8; IV_LENGTH],
        encryption_agent: EncryptionAgent,
        wrapped_content_key: WrappedContentKey,
    ) -> Self {
        Self {
            wrapped_content_key,
            encryption_agent,
            content_encryption_iv,
            encryption_mode: None,
            key_wrapping_metadata: None,
        }
    }

    /// Mark as a whole-object envelope.
    pub fn with_full_blob_mode(mut self) -> Self {
        self.encryption_mode = Some(ENCRYPTION_MODE_FULL_BLOB.to_string());
        self
    }

    /// Record the library that produced this envelope.
    pub fn with_encryption_library(mut self, library: impl Into<String>) -> Self {
        self.key_wrapping_metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(ENCRYPTION_LIBRARY_KEY.to_string(), library.into());
        self
    }

    pub fn encryption_library(&self) -> Option<&str> {
        self.key_wrapping_metadata
            .as_ref()
            .and_then(|m| m.get(ENCRYPTION_LIBRARY_KEY))
            .map(String::as_str)
    }

    /// Serialize to the JSON string stored in object metadata.
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).map_err(|e| CryptoError::InvalidEncryptionData(e.to_string()))
    }

    /// Parse the JSON string stored in object metadata.
    ///
    /// The protocol version is checked before the rest of the record, so a
    /// record written by a newer protocol reports its version rather than a
    /// missing field.
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CryptoError::InvalidEncryptionData(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, CryptoError> {
        serde_json::to_value(self).map_err(|e| CryptoError::InvalidEncryptionData(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CryptoError> {
        check_protocol(&value)?;
        serde_json::from_value(value).map_err(|e| CryptoError::InvalidEncryptionData(e.to_string()))
    }
}

/// Reject a raw record whose `EncryptionAgent.Protocol` is not supported.
///
/// A record without a readable protocol passes here and fails the strict
/// parse instead.
pub fn check_protocol(value: &serde_json::Value) -> Result<(), CryptoError> {
    let protocol = value
        .get("EncryptionAgent")
        .and_then(|agent| agent.get("Protocol"))
        .and_then(serde_json::Value::as_str);
    match protocol {
        Some(p) if !SUPPORTED_PROTOCOLS.contains(&p) => {
            Err(CryptoError::UnsupportedEncryptionVersion(p.to_string()))
        }
        _ => Ok(()),
    }
}
