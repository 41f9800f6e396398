//! Error types shared by the hub and the connection layer.
//!
//! None of these are fatal to the hub itself: a failing connection only ends
//! its own reader/writer tasks, and a failed encode only skips one broadcast.

use thiserror::Error;

use crate::client_manager::ClientId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Inbound payload could not be decoded into an envelope.
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Outbound frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    #[error("outbound queue of client {0} is full")]
    QueueFull(ClientId),

    #[error("outbound queue of client {0} is closed")]
    QueueClosed(ClientId),

    #[error("keepalive ping timed out")]
    PingTimeout,

    #[error("hub is no longer running")]
    HubClosed,
}
