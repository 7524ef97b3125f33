//! Queue client with per-message client-side encryption.
//!
//! An encrypted message's text is a JSON document:
//!
//! ```text
//! { "EncryptedMessageContents": "<b64 ciphertext>", "EncryptionData": { ... } }
//! ```
//!
//! Text that is not JSON, or lacks either field, counts as not encrypted.
//! Once both fields are present the message is treated as encrypted, and any
//! problem with them is an error rather than plaintext.

use std::sync::Arc;

use envelope_crypto::{
    base64_decode, base64_encode, check_protocol, CryptoError, EncryptionData, EncryptionPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientOptions;
use crate::error::Result;
use crate::transport::{QueueMessage, QueueTransport};

const CONTENTS_FIELD: &str = "EncryptedMessageContents";
const ENCRYPTION_DATA_FIELD: &str = "EncryptionData";

/// Wire form of an encrypted queue message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptedMessage {
    pub encrypted_message_contents: String,
    pub encryption_data: EncryptionData,
}

impl EncryptedMessage {
    /// Parse message text.
    ///
    /// `Ok(None)` when the text is not an encrypted message. A message with
    /// both envelope fields but an unsupported protocol reports the version;
    /// any other defect in them is a `DecryptionFailure`.
    pub fn parse(text: &str) -> std::result::Result<Option<Self>, CryptoError> {
        let Ok(Value::Object(mut fields)) = serde_json::from_str::<Value>(text) else {
            return Ok(None);
        };
        let (Some(contents), Some(encryption_data)) = (
            fields.remove(CONTENTS_FIELD),
            fields.remove(ENCRYPTION_DATA_FIELD),
        ) else {
            return Ok(None);
        };

        check_protocol(&encryption_data)?;
        let Value::String(encrypted_message_contents) = contents else {
            return Err(CryptoError::DecryptionFailure);
        };
        let encryption_data = EncryptionData::from_value(encryption_data)
            .map_err(|_| CryptoError::DecryptionFailure)?;
        Ok(Some(Self {
            encrypted_message_contents,
            encryption_data,
        }))
    }
}

pub struct QueueClient<T: QueueTransport> {
    transport: Arc<T>,
    queue: String,
    policy: Arc<EncryptionPolicy>,
    options: ClientOptions,
}

impl<T: QueueTransport> QueueClient<T> {
    pub fn new(transport: Arc<T>, queue: impl Into<String>, policy: Arc<EncryptionPolicy>) -> Self {
        Self::with_options(transport, queue, policy, ClientOptions::default())
    }

    pub fn with_options(
        transport: Arc<T>,
        queue: impl Into<String>,
        policy: Arc<EncryptionPolicy>,
        options: ClientOptions,
    ) -> Self {
        Self {
            transport,
            queue: queue.into(),
            policy,
            options,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    pub fn policy(&self) -> &EncryptionPolicy {
        &self.policy
    }

    /// Enqueue `content`, encrypting it when a KEK is configured.
    ///
    /// Fails before any transport call when encryption is required but no
    /// KEK is configured.
    pub async fn put_message(&self, content: &str) -> Result<String> {
        let text = self.encode(content)?;
        Ok(self.transport.put_message(&self.queue, text).await?)
    }

    /// Replace the content of message `id`, encrypting it like `put_message`.
    pub async fn update_message(&self, id: &str, content: &str) -> Result<()> {
        let text = self.encode(content)?;
        self.transport
            .update_message(&self.queue, id, text)
            .await?;
        Ok(())
    }

    /// Dequeue up to `max_messages` messages and decrypt their content.
    ///
    /// Without a KEK or resolver the raw message text is returned.
    pub async fn get_messages(&self, max_messages: usize) -> Result<Vec<QueueMessage>> {
        self.policy.check_read_capable()?;
        let messages = self
            .transport
            .get_messages(&self.queue, max_messages)
            .await?;
        self.decode_all(messages)
    }

    /// Like `get_messages`, but leaves the messages on the queue.
    pub async fn peek_messages(&self, max_messages: usize) -> Result<Vec<QueueMessage>> {
        self.policy.check_read_capable()?;
        let messages = self
            .transport
            .peek_messages(&self.queue, max_messages)
            .await?;
        self.decode_all(messages)
    }

    fn encode(&self, content: &str) -> Result<String> {
        if let Err(e) = self.policy.check_write() {
            warn!(queue = %self.queue, "refusing unencrypted message: {}", e);
            return Err(e.into());
        }
        let (payload, encryption_data) = self.policy.encrypt_for_write(content.as_bytes())?;
        let Some(data) = encryption_data else {
            return Ok(content.to_string());
        };
        debug!(
            queue = %self.queue,
            kid = %data.wrapped_content_key.key_id,
            "encrypting message"
        );
        let message = EncryptedMessage {
            encrypted_message_contents: base64_encode(&payload),
            encryption_data: data.with_encryption_library(self.options.encryption_library.clone()),
        };
        Ok(serde_json::to_string(&message)?)
    }

    fn decode_all(&self, messages: Vec<QueueMessage>) -> Result<Vec<QueueMessage>> {
        if !self.policy.has_key_source() {
            return Ok(messages);
        }
        messages
            .into_iter()
            .map(|mut message| -> Result<QueueMessage> {
                message.content = self.decode(&message.id, message.content)?;
                Ok(message)
            })
            .collect()
    }

    fn decode(&self, id: &str, text: String) -> Result<String> {
        let message = match EncryptedMessage::parse(&text) {
            Ok(Some(message)) => message,
            Ok(None) if self.policy.is_encryption_required() => {
                warn!(queue = %self.queue, message = id, "plaintext message rejected");
                return Err(CryptoError::MessageNotEncrypted.into());
            }
            Ok(None) => return Ok(text),
            Err(e) => {
                warn!(queue = %self.queue, message = id, "unreadable message envelope: {}", e);
                return Err(e.into());
            }
        };

        debug!(
            queue = %self.queue,
            message = id,
            kid = %message.encryption_data.wrapped_content_key.key_id,
            "decrypting message"
        );
        let ciphertext = base64_decode(&message.encrypted_message_contents)
            .map_err(|_| CryptoError::DecryptionFailure)?;
        let plaintext = self
            .policy
            .decrypt_for_read(ciphertext, Some(&message.encryption_data))?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailure.into())
    }
}
