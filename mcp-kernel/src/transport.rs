//! Streaming HTTP transport envelope.
//!
//! A "transport" here is the server-side half of one client session: a
//! channel the rest of the server can push JSON-RPC messages (results of
//! background work, notifications) into, which eventually surface on the
//! client's SSE stream. Request/response pairs for synchronous tool calls
//! don't need this — they return directly from the POST handler — but
//! anything async (the testing-agent pipeline's completion, a heartbeat
//! nudge) has nowhere else to go.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::jsonrpc::JsonRpcMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Generic transport contract. `recover` builds a fresh
/// instance bound to the same session id; the old instance is dropped.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: &JsonRpcMessage) -> Result<(), TransportError>;
    async fn close(&self);
}

/// SSE-backed transport: outbound messages are serialized to one JSON
/// object per line and pushed to an unbounded channel; the axum `GET /rpc`
/// handler drains the paired receiver into the response stream.
pub struct SseTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl SseTransport {
    /// Returns the transport plus the receiving half the HTTP handler owns.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn send(&self, message: &JsonRpcMessage) -> Result<(), TransportError> {
        let line = serde_json::to_string(message)?;
        self.tx.send(line).map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {
        // Dropping the sender side would close the channel; since we only
        // hold a clone here, an explicit close is a no-op signal for
        // callers that don't own the original sender.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{JsonRpcNotification, RequestId};

    #[tokio::test]
    async fn send_reaches_receiver() {
        let (transport, mut rx) = SseTransport::pair();
        let notif = JsonRpcMessage::Notification(JsonRpcNotification::new(
            "ping",
            None,
        ));
        transport.send(&notif).await.unwrap();
        let line = rx.recv().await.unwrap();
        assert!(line.contains("ping"));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_errors() {
        let (transport, rx) = SseTransport::pair();
        drop(rx);
        let notif = JsonRpcMessage::Notification(JsonRpcNotification::new("ping", None));
        let err = transport.send(&notif).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        let _ = RequestId::Number(1);
    }
}
