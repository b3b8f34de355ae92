//! Connector seam between the transport manager and a concrete socket.
//!
//! Production uses [`WsConnector`] (tokio-tungstenite), tests use
//! [`MemoryConnector`](crate::memory::MemoryConnector).

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Opens links to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Type of an open link.
    type Link: Link;

    /// Dial `endpoint` and wait for the handshake to complete.
    async fn connect(&self, endpoint: &str) -> Result<Self::Link>;
}

/// One open, bidirectional text link.
///
/// `recv` must be cancel-safe: the manager races it against outbound sends
/// and shutdown.
#[async_trait]
pub trait Link: Send + 'static {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next text frame. `None` once the peer has closed the link.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Close the link. Errors are swallowed; the link is gone either way.
    async fn close(&mut self);
}

/// WebSocket connector for `ws://` and `wss://` endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connector for WsConnector {
    type Link = WsLink;

    async fn connect(&self, endpoint: &str) -> Result<WsLink> {
        let (stream, response) = connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(endpoint, status = %response.status(), "websocket handshake complete");
        Ok(WsLink { stream })
    }
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "close frame received");
                    return None;
                }
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "websocket close failed");
        }
    }
}
