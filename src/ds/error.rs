/// Errors originating from the session / delivery layer.
///
/// String payloads carry the underlying transport's message. Callers should
/// treat them as opaque diagnostic text, not match on their content.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryServiceError {
    #[error("Session start failed: {0}")]
    SessionStart(String),
    #[error("Outbound sink closed")]
    SinkClosed,

    #[error("An unknown error occurred: {0}")]
    Other(anyhow::Error),
}

/// A per-event delivery problem reported by the transport.
///
/// Carried inside [`InboundEvent::TransportError`](super::InboundEvent) and
/// always recovered by the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportEventError {
    #[error("Failed to decrypt message from {sender}: {reason}")]
    Decryption { sender: String, reason: String },
    #[error("Malformed message: {0}")]
    Malformed(String),
    #[error("Transport error: {0}")]
    Other(String),
}
