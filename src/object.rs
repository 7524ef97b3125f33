//! Object (blob) client with whole-object client-side encryption.
//!
//! Upload:   policy check → encrypt(body) → metadata["encryptiondata"] = JSON → transport
//! Download: policy check → transport → parse "encryptiondata" → decrypt or pass through

use std::collections::HashMap;
use std::sync::Arc;

use envelope_crypto::{
    CryptoError, EncryptionData, EncryptionPolicy, ENCRYPTION_DATA_METADATA_KEY,
    ENCRYPTION_MODE_FULL_BLOB,
};
use tracing::{debug, warn};

use crate::config::ClientOptions;
use crate::error::{Result, StorageError};
use crate::transport::ObjectTransport;

/// A downloaded object after client-side decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedObject {
    pub content: Vec<u8>,
    /// User metadata, without the encryption envelope entry.
    pub metadata: HashMap<String, String>,
    /// Whether the stored object carried an encryption envelope.
    pub was_encrypted: bool,
}

pub struct ObjectClient<T: ObjectTransport> {
    transport: Arc<T>,
    policy: Arc<EncryptionPolicy>,
    options: ClientOptions,
}

impl<T: ObjectTransport> ObjectClient<T> {
    pub fn new(transport: Arc<T>, policy: Arc<EncryptionPolicy>) -> Self {
        Self::with_options(transport, policy, ClientOptions::default())
    }

    pub fn with_options(
        transport: Arc<T>,
        policy: Arc<EncryptionPolicy>,
        options: ClientOptions,
    ) -> Self {
        Self {
            transport,
            policy,
            options,
        }
    }

    pub fn policy(&self) -> &EncryptionPolicy {
        &self.policy
    }

    /// Upload `content` as the whole of object `name`.
    ///
    /// With a KEK configured the body is encrypted and the envelope is stored
    /// under the `encryptiondata` metadata key. Fails before any transport
    /// call when encryption is required but no KEK is configured.
    pub async fn put_object(
        &self,
        name: &str,
        content: Vec<u8>,
        mut metadata: HashMap<String, String>,
    ) -> Result<()> {
        if let Err(e) = self.policy.check_write() {
            warn!(object = name, "refusing unencrypted upload: {}", e);
            return Err(e.into());
        }
        if metadata.contains_key(ENCRYPTION_DATA_METADATA_KEY) {
            return Err(CryptoError::InvalidEncryptionData(format!(
                "user metadata may not set the reserved key {ENCRYPTION_DATA_METADATA_KEY}"
            ))
            .into());
        }

        let (body, encryption_data) = self.encrypt_body(content).await?;
        if let Some(data) = encryption_data {
            let data = data
                .with_full_blob_mode()
                .with_encryption_library(self.options.encryption_library.clone());
            debug!(
                object = name,
                kid = %data.wrapped_content_key.key_id,
                "uploading encrypted object"
            );
            metadata.insert(ENCRYPTION_DATA_METADATA_KEY.to_string(), data.to_json()?);
        } else {
            debug!(object = name, "uploading unencrypted object");
        }

        self.transport.put_object(name, body, metadata).await?;
        Ok(())
    }

    /// Download and, when it carries an envelope, decrypt object `name`.
    ///
    /// Without a KEK or resolver the stored body and metadata (envelope
    /// included) are returned unmodified.
    pub async fn get_object(&self, name: &str) -> Result<DownloadedObject> {
        self.policy.check_read_capable()?;

        let stored = self.transport.get_object(name).await?;
        if !self.policy.has_key_source() {
            // Nothing could unwrap a key: hand back the stored bytes as-is.
            let was_encrypted = stored.metadata.contains_key(ENCRYPTION_DATA_METADATA_KEY);
            return Ok(DownloadedObject {
                content: stored.body,
                metadata: stored.metadata,
                was_encrypted,
            });
        }

        let mut metadata = stored.metadata;
        let encryption_data = metadata
            .remove(ENCRYPTION_DATA_METADATA_KEY)
            .map(|json| parse_object_encryption_data(&json))
            .transpose()?;
        let was_encrypted = encryption_data.is_some();

        if let Some(data) = &encryption_data {
            debug!(
                object = name,
                kid = %data.wrapped_content_key.key_id,
                "decrypting object"
            );
        }
        let content = match self.decrypt_body(stored.body, encryption_data).await {
            Ok(content) => content,
            Err(e) => {
                warn!(object = name, "object read rejected: {}", e);
                return Err(e);
            }
        };

        Ok(DownloadedObject {
            content,
            metadata,
            was_encrypted,
        })
    }

    /// Append to object `name`. Refused when uploads are encrypted, since an
    /// envelope covers exactly one whole object.
    pub async fn append_object(&self, name: &str, data: Vec<u8>) -> Result<()> {
        self.policy.check_whole_object_write("append_object")?;
        self.transport.append_object(name, data).await?;
        Ok(())
    }

    async fn encrypt_body(&self, content: Vec<u8>) -> Result<(Vec<u8>, Option<EncryptionData>)> {
        if content.len() < self.options.blocking_threshold {
            return Ok(self.policy.encrypt_for_write(&content)?);
        }
        let policy = self.policy.clone();
        let result = tokio::task::spawn_blocking(move || policy.encrypt_for_write(&content))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?;
        Ok(result?)
    }

    async fn decrypt_body(
        &self,
        body: Vec<u8>,
        encryption_data: Option<EncryptionData>,
    ) -> Result<Vec<u8>> {
        if body.len() < self.options.blocking_threshold {
            return Ok(self
                .policy
                .decrypt_for_read(body, encryption_data.as_ref())?);
        }
        let policy = self.policy.clone();
        let result = tokio::task::spawn_blocking(move || {
            policy.decrypt_for_read(body, encryption_data.as_ref())
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?;
        Ok(result?)
    }
}

/// Parse the `encryptiondata` metadata value of a stored object.
/// The protocol version is checked before the rest of the record.
pub fn parse_object_encryption_data(
    json: &str,
) -> std::result::Result<EncryptionData, CryptoError> {
    let data = EncryptionData::from_json(json)?;
    match data.encryption_mode.as_deref() {
        None | Some(ENCRYPTION_MODE_FULL_BLOB) => Ok(data),
        Some(other) => Err(CryptoError::InvalidEncryptionData(format!(
            "unsupported encryption mode {other}"
        ))),
    }
}
