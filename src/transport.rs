//! Transport traits: the out-of-process half of the object and queue clients.
//!
//! The encryption layer never talks to the network itself. It hands opaque
//! bytes plus a side-channel metadata map to an `ObjectTransport`, or opaque
//! message text to a `QueueTransport`, and receives the same back on reads.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ObjectTransport: user-provided object (blob) layer
// ============================================================================

/// User-implemented transport for whole-object storage.
#[async_trait]
pub trait ObjectTransport: Send + Sync {
    /// Store `body` under `name`, replacing any existing object.
    async fn put_object(
        &self,
        name: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<(), TransportError>;

    /// Fetch the full body and metadata of `name`.
    async fn get_object(&self, name: &str) -> Result<StoredObject, TransportError>;

    /// Append `data` to the end of `name`, creating it if absent.
    async fn append_object(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError>;
}

/// Object body and its side-channel metadata, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

// ============================================================================
// QueueTransport: user-provided message layer
// ============================================================================

/// User-implemented transport for queue messages.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Enqueue `text`. Returns the service-assigned message id.
    async fn put_message(&self, queue: &str, text: String) -> Result<String, TransportError>;

    /// Dequeue up to `max_messages` messages.
    async fn get_messages(
        &self,
        queue: &str,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError>;

    /// Return up to `max_messages` messages from the front of the queue
    /// without dequeuing them.
    async fn peek_messages(
        &self,
        queue: &str,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError>;

    /// Replace the text of message `id`.
    async fn update_message(
        &self,
        queue: &str,
        id: &str,
        text: String,
    ) -> Result<(), TransportError>;
}

/// A queue message as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    /// Message text. Plaintext after a client read, raw wire text from a transport.
    pub content: String,
    pub insertion_time: DateTime<Utc>,
    pub dequeue_count: u32,
}

// ============================================================================
// TransportError
// ============================================================================

/// Failure reported by a transport implementation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub kind: TransportErrorKind,
}

impl TransportError {
    /// The service refused the request and retrying will not help.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: TransportErrorKind::Rejected,
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self {
            message: format!("{what} not found"),
            kind: TransportErrorKind::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request rejected, e.g. a message over the size limit
    Rejected,
    /// Object, queue or message does not exist
    NotFound,
}
