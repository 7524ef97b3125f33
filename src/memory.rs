//! MemoryTransport: an in-process `ObjectTransport` + `QueueTransport`.
//!
//! Objects and queues live in `HashMap`s behind `parking_lot::Mutex`. Every
//! trait call is counted, which lets tests assert that a rejected operation
//! never reached the transport.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::transport::{
    ObjectTransport, QueueMessage, QueueTransport, StoredObject, TransportError,
};

/// Largest message text the queue service accepts (64 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub struct MemoryTransport {
    /// object name → stored object
    objects: Mutex<HashMap<String, StoredObject>>,
    /// queue name → messages in arrival order
    queues: Mutex<HashMap<String, VecDeque<QueueMessage>>>,
    max_message_size: usize,
    calls: AtomicUsize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Number of transport calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Raw stored object, bypassing any client-side decryption.
    pub fn raw_object(&self, name: &str) -> Option<StoredObject> {
        self.objects.lock().get(name).cloned()
    }

    /// Raw message texts of `queue`, oldest first, without dequeuing.
    pub fn raw_messages(&self, queue: &str) -> Vec<String> {
        self.queues
            .lock()
            .get(queue)
            .map(|q| q.iter().map(|m| m.content.clone()).collect())
            .unwrap_or_default()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_message_size(&self, text: &str) -> Result<(), TransportError> {
        if text.len() > self.max_message_size {
            return Err(TransportError::rejected(format!(
                "message of {} bytes exceeds the {} byte limit",
                text.len(),
                self.max_message_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectTransport for MemoryTransport {
    async fn put_object(
        &self,
        name: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<(), TransportError> {
        self.record_call();
        self.objects
            .lock()
            .insert(name.to_string(), StoredObject { body, metadata });
        Ok(())
    }

    async fn get_object(&self, name: &str) -> Result<StoredObject, TransportError> {
        self.record_call();
        self.objects
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::not_found(format!("object {name}")))
    }

    async fn append_object(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        self.record_call();
        self.objects
            .lock()
            .entry(name.to_string())
            .or_default()
            .body
            .extend_from_slice(&data);
        Ok(())
    }
}

#[async_trait]
impl QueueTransport for MemoryTransport {
    async fn put_message(&self, queue: &str, text: String) -> Result<String, TransportError> {
        self.record_call();
        self.check_message_size(&text)?;
        let id = uuid::Uuid::new_v4().to_string();
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(QueueMessage {
                id: id.clone(),
                content: text,
                insertion_time: Utc::now(),
                dequeue_count: 0,
            });
        Ok(id)
    }

    async fn get_messages(
        &self,
        queue: &str,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        self.record_call();
        let mut queues = self.queues.lock();
        let Some(messages) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };
        let count = max_messages.min(messages.len());
        Ok(messages
            .drain(..count)
            .map(|mut m| {
                m.dequeue_count += 1;
                m
            })
            .collect())
    }

    async fn peek_messages(
        &self,
        queue: &str,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        self.record_call();
        Ok(self
            .queues
            .lock()
            .get(queue)
            .map(|q| q.iter().take(max_messages).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_message(
        &self,
        queue: &str,
        id: &str,
        text: String,
    ) -> Result<(), TransportError> {
        self.record_call();
        self.check_message_size(&text)?;
        let mut queues = self.queues.lock();
        let message = queues
            .get_mut(queue)
            .and_then(|q| q.iter_mut().find(|m| m.id == id))
            .ok_or_else(|| TransportError::not_found(format!("message {id}")))?;
        message.content = text;
        Ok(())
    }
}
