//! Transport error types.

use thiserror::Error;

use crate::types::ConnectionState;

/// Errors surfaced by the transport layer.
///
/// None of these are fatal: a failed dial or a dropped link schedules a
/// reconnection, and a rejected send is simply not transmitted.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `send` was called while the link was not open.
    #[error("not connected (status: {0})")]
    NotConnected(ConnectionState),

    /// The manager has been shut down.
    #[error("transport disposed")]
    Disposed,

    /// Dialing the endpoint failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The peer closed the link.
    #[error("link closed")]
    Closed,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
