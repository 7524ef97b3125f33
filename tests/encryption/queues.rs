use std::sync::Arc;

use envelope_storage::{
    CryptoError, EncryptedMessage, EncryptionPolicy, KeyEncryptionKey, MemoryTransport,
    QueueClient, QueueTransport, StorageError, TransportErrorKind,
};
use serde_json::{json, Value};

use crate::common::{kek, resolver_reader, strict_writer, writer};

#[tokio::test]
async fn encrypted_message_round_trip() {
    let transport = Arc::new(MemoryTransport::new());
    let client = QueueClient::new(transport.clone(), "jobs", writer(kek("local:key1")));

    let id = client.put_message("process order 42").await.unwrap();
    let messages = client.get_messages(1).await.unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, id);
    assert_eq!(messages[0].content, "process order 42");
    assert_eq!(messages[0].dequeue_count, 1);
}

#[tokio::test]
async fn raw_message_decrypts_with_engine() {
    let transport = Arc::new(MemoryTransport::new());
    let key = kek("local:key1");
    let client = QueueClient::new(transport.clone(), "jobs", writer(key.clone()));
    client.put_message("secret text").await.unwrap();

    let raw = transport.raw_messages("jobs").remove(0);
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["EncryptedMessageContents"].is_string());
    assert_eq!(value["EncryptionData"]["EncryptionAgent"]["Protocol"], "1.0");

    let message = EncryptedMessage::parse(&raw).unwrap().unwrap();
    let ciphertext = envelope_crypto::base64_decode(&message.encrypted_message_contents).unwrap();
    let plaintext = envelope_crypto::decrypt(
        &ciphertext,
        Some(&message.encryption_data),
        Some(key.as_ref()),
        None,
    )
    .unwrap();
    assert_eq!(plaintext, b"secret text");
}

#[tokio::test]
async fn update_keeps_message_encrypted() {
    let transport = Arc::new(MemoryTransport::new());
    let client = QueueClient::new(transport.clone(), "jobs", writer(kek("local:key1")));
    let id = client.put_message("draft").await.unwrap();
    client.update_message(&id, "final").await.unwrap();

    let raw = transport.raw_messages("jobs").remove(0);
    assert!(EncryptedMessage::parse(&raw).unwrap().is_some());
    assert!(!raw.contains("final"));

    let messages = client.get_messages(1).await.unwrap();
    assert_eq!(messages[0].content, "final");
}

#[tokio::test]
async fn resolver_reads_messages_from_several_writers() {
    let transport = Arc::new(MemoryTransport::new());
    let key1 = kek("local:key1");
    let key2 = kek("local:key2");
    QueueClient::new(transport.clone(), "jobs", writer(key1.clone()))
        .put_message("from one")
        .await
        .unwrap();
    QueueClient::new(transport.clone(), "jobs", writer(key2.clone()))
        .put_message("from two")
        .await
        .unwrap();

    let reader = QueueClient::new(transport, "jobs", resolver_reader(vec![key1, key2]));
    let contents: Vec<_> = reader
        .get_messages(5)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["from one", "from two"]);
}

#[tokio::test]
async fn strict_without_kek_never_reaches_transport() {
    let transport = Arc::new(MemoryTransport::new());
    let policy = Arc::new(EncryptionPolicy::new().require_encryption(true));
    let client = QueueClient::new(transport.clone(), "jobs", policy);

    let err = client.put_message("plain").await.unwrap_err();
    assert!(matches!(
        err.encryption_error(),
        Some(CryptoError::EncryptionRequiredViolation)
    ));
    let err = client.update_message("id", "plain").await.unwrap_err();
    assert!(matches!(
        err.encryption_error(),
        Some(CryptoError::EncryptionRequiredViolation)
    ));
    let err = client.get_messages(1).await.unwrap_err();
    assert!(matches!(
        err.encryption_error(),
        Some(CryptoError::KekCapabilityMissing(_))
    ));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn strict_read_rejects_plaintext_message() {
    let transport = Arc::new(MemoryTransport::new());
    QueueClient::new(transport.clone(), "jobs", Arc::new(EncryptionPolicy::new()))
        .put_message("plain")
        .await
        .unwrap();

    let strict = QueueClient::new(transport, "jobs", strict_writer(kek("local:key1")));
    let err = strict.get_messages(1).await.unwrap_err();
    assert!(matches!(
        err.encryption_error(),
        Some(CryptoError::MessageNotEncrypted)
    ));
}

#[tokio::test]
async fn keyless_reader_sees_wire_text() {
    let transport = Arc::new(MemoryTransport::new());
    QueueClient::new(transport.clone(), "jobs", writer(kek("local:key1")))
        .put_message("secret")
        .await
        .unwrap();
    let raw = transport.raw_messages("jobs").remove(0);

    let reader = QueueClient::new(transport, "jobs", Arc::new(EncryptionPolicy::new()));
    let messages = reader.get_messages(1).await.unwrap();
    assert_eq!(messages[0].content, raw);
}

#[tokio::test]
async fn wrong_kek_id_is_rejected() {
    let transport = Arc::new(MemoryTransport::new());
    QueueClient::new(transport.clone(), "jobs", writer(kek("local:key1")))
        .put_message("secret")
        .await
        .unwrap();

    let reader = QueueClient::new(transport, "jobs", writer(kek("local:key2")));
    let err = reader.get_messages(1).await.unwrap_err();
    assert!(matches!(
        err.encryption_error(),
        Some(CryptoError::KekIdMismatch { .. })
    ));
}

#[tokio::test]
async fn encryption_overhead_can_exceed_message_limit() {
    let transport = Arc::new(MemoryTransport::new());
    let client = QueueClient::new(transport.clone(), "jobs", writer(kek("local:key1")));

    // Fits as plaintext, not once base64 ciphertext and metadata are added
    let content = "x".repeat(48 * 1024);
    let err = client.put_message(&content).await.unwrap_err();
    match err {
        StorageError::Transport(e) => {
            assert_eq!(e.kind, TransportErrorKind::Rejected)
        }
        other => panic!("expected transport error, got {other:?}"),
    }

    let plain = QueueClient::new(transport, "jobs", Arc::new(EncryptionPolicy::new()));
    plain.put_message(&content).await.unwrap();
}

// ============================================================================
// Malformed envelopes
// ============================================================================

/// Store one encrypted message, then rewrite its `EncryptionData` in place.
async fn stored_with_edited_metadata(
    key: Arc<dyn KeyEncryptionKey>,
    edit: impl FnOnce(&mut Value),
) -> Arc<MemoryTransport> {
    let transport = Arc::new(MemoryTransport::new());
    let id = QueueClient::new(transport.clone(), "jobs", writer(key))
        .put_message("secret")
        .await
        .unwrap();
    let mut envelope: Value = serde_json::from_str(&transport.raw_messages("jobs")[0]).unwrap();
    edit(&mut envelope["EncryptionData"]);
    transport
        .update_message("jobs", &id, envelope.to_string())
        .await
        .unwrap();
    transport
}

async fn read_error(transport: Arc<MemoryTransport>, policy: Arc<EncryptionPolicy>) -> StorageError {
    QueueClient::new(transport, "jobs", policy)
        .get_messages(1)
        .await
        .unwrap_err()
}

async fn assert_decryption_failure_for_both_readers(edit: fn(&mut Value)) {
    let key = kek("local:key1");
    for strict in [false, true] {
        let transport = stored_with_edited_metadata(key.clone(), edit).await;
        let policy = if strict {
            strict_writer(key.clone())
        } else {
            writer(key.clone())
        };
        let err = read_error(transport, policy).await;
        assert!(
            matches!(err.encryption_error(), Some(CryptoError::DecryptionFailure)),
            "strict={strict}: {err:?}"
        );
    }
}

#[tokio::test]
async fn twelve_byte_iv_is_decryption_failure() {
    assert_decryption_failure_for_both_readers(|data| {
        data["ContentEncryptionIV"] = json!("AAECAwQFBgcICQoL");
    })
    .await;
}

#[tokio::test]
async fn bad_wrapped_key_base64_is_decryption_failure() {
    assert_decryption_failure_for_both_readers(|data| {
        data["WrappedContentKey"]["EncryptedKey"] = json!("not base64!");
    })
    .await;
}

#[tokio::test]
async fn missing_iv_is_decryption_failure() {
    assert_decryption_failure_for_both_readers(|data| {
        data.as_object_mut().unwrap().remove("ContentEncryptionIV");
    })
    .await;
}

#[tokio::test]
async fn newer_protocol_envelope_reports_version() {
    let key = kek("local:key1");
    for policy in [writer(key.clone()), strict_writer(key.clone())] {
        let transport = stored_with_edited_metadata(key.clone(), |data| {
            *data = json!({
                "WrappedContentKey": {"KeyId": "local:key1", "EncryptedKey": "AQIDBA==", "Algorithm": "A256KW"},
                "EncryptionAgent": {"Protocol": "2.0", "EncryptionAlgorithm": "AES_GCM_256"},
                "ContentEncryptionNonce": "AAECAwQFBgcICQoL"
            });
        })
        .await;
        let err = read_error(transport, policy).await;
        assert!(matches!(
            err.encryption_error(),
            Some(CryptoError::UnsupportedEncryptionVersion(v)) if v == "2.0"
        ));
    }
}

// ============================================================================
// Peek
// ============================================================================

#[tokio::test]
async fn peek_decrypts_with_kek_and_leaves_messages() {
    let transport = Arc::new(MemoryTransport::new());
    let client = QueueClient::new(transport.clone(), "jobs", writer(kek("local:key1")));
    client.put_message("first").await.unwrap();
    client.put_message("second").await.unwrap();

    let peeked = client.peek_messages(5).await.unwrap();
    let contents: Vec<_> = peeked.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert_eq!(peeked[0].dequeue_count, 0);
    assert_eq!(transport.raw_messages("jobs").len(), 2);

    assert_eq!(client.get_messages(5).await.unwrap().len(), 2);
}

#[tokio::test]
async fn peek_decrypts_with_resolver() {
    let transport = Arc::new(MemoryTransport::new());
    let key1 = kek("local:key1");
    let key2 = kek("local:key2");
    QueueClient::new(transport.clone(), "jobs", writer(key1.clone()))
        .put_message("from one")
        .await
        .unwrap();
    QueueClient::new(transport.clone(), "jobs", writer(key2.clone()))
        .put_message("from two")
        .await
        .unwrap();

    let reader = QueueClient::new(transport, "jobs", resolver_reader(vec![key1, key2]));
    let contents: Vec<_> = reader
        .peek_messages(5)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["from one", "from two"]);
}

#[tokio::test]
async fn strict_peek_without_keys_never_reaches_transport() {
    let transport = Arc::new(MemoryTransport::new());
    let policy = Arc::new(EncryptionPolicy::new().require_encryption(true));
    let err = QueueClient::new(transport.clone(), "jobs", policy)
        .peek_messages(1)
        .await
        .unwrap_err();
    assert!(matches!(
        err.encryption_error(),
        Some(CryptoError::KekCapabilityMissing(_))
    ));
    assert_eq!(transport.calls(), 0);
}
