//! In-process connector for tests and demos.
//!
//! [`MemoryConnector::new`] returns the client-side connector and a
//! [`MemoryServer`] handle. Every successful dial shows up on the server as a
//! [`MemoryPeer`] that can push frames to the client and read its commands.
//!
//! ```
//! # tokio_test::block_on(async {
//! use idle_miner_transport::connector::{Connector, Link};
//! use idle_miner_transport::memory::MemoryConnector;
//!
//! let (connector, mut server) = MemoryConnector::new();
//! let mut link = connector.connect("mem://game/ws/1").await.unwrap();
//! let mut peer = server.accept().await.unwrap();
//!
//! peer.send_text(r#"{"type":"mining_stopped"}"#);
//! assert_eq!(link.recv().await.unwrap().unwrap(), r#"{"type":"mining_stopped"}"#);
//!
//! link.send("hello".into()).await.unwrap();
//! assert_eq!(peer.recv_text().await.as_deref(), Some("hello"));
//! # });
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::connector::{Connector, Link};
use crate::error::{Result, TransportError};

/// One recorded dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub endpoint: String,
    pub at: Instant,
    pub refused: bool,
}

struct Shared {
    refusals: AtomicUsize,
    attempts: Mutex<Vec<ConnectAttempt>>,
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
}

impl Shared {
    fn attempts(&self) -> std::sync::MutexGuard<'_, Vec<ConnectAttempt>> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MemoryConnector, MemoryServer) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            refusals: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
            accept_tx,
        });
        (
            MemoryConnector {
                shared: Arc::clone(&shared),
            },
            MemoryServer { shared, accept_rx },
        )
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Link = MemoryLink;

    async fn connect(&self, endpoint: &str) -> Result<MemoryLink> {
        let refused = self
            .shared
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        self.shared.attempts().push(ConnectAttempt {
            endpoint: endpoint.to_string(),
            at: Instant::now(),
            refused,
        });

        if refused {
            return Err(TransportError::Connect(format!("{endpoint}: connection refused")));
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            endpoint: endpoint.to_string(),
            inbound: from_client,
            outbound: to_client,
        };
        self.shared
            .accept_tx
            .send(peer)
            .map_err(|_| TransportError::Connect(format!("{endpoint}: no listener")))?;

        Ok(MemoryLink {
            inbound: from_server,
            outbound: Some(to_server),
        })
    }
}

/// Server side of the in-memory connector.
pub struct MemoryServer {
    shared: Arc<Shared>,
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryServer {
    /// Wait for the next successful dial.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }

    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.try_recv().ok()
    }

    /// Refuse the next `n` dials.
    pub fn refuse_next(&self, n: usize) {
        self.shared.refusals.store(n, Ordering::SeqCst);
    }

    /// Every dial so far, refused or not.
    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.shared.attempts().clone()
    }
}

/// Server-side handle to one accepted link.
pub struct MemoryPeer {
    endpoint: String,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

impl MemoryPeer {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Push a raw frame. Returns false once the client side is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.outbound.send(text.into()).is_ok()
    }

    pub fn send_json<T: Serialize>(&self, message: &T) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(text),
            Err(_) => false,
        }
    }

    /// Next frame sent by the client, `None` once it closed the link.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    pub fn try_recv_text(&mut self) -> Option<String> {
        self.inbound.try_recv().ok()
    }

    /// Drop the link from the server side.
    pub fn close(self) {}
}

/// Client side of an in-memory link.
pub struct MemoryLink {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl Link for MemoryLink {
    async fn send(&mut self, text: String) -> Result<()> {
        match &self.outbound {
            Some(tx) => tx.send(text).map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.outbound = None;
        self.inbound.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refusals_are_recorded_and_consumed() {
        let (connector, mut server) = MemoryConnector::new();
        server.refuse_next(2);

        assert!(connector.connect("mem://a").await.is_err());
        assert!(connector.connect("mem://a").await.is_err());
        assert!(connector.connect("mem://a").await.is_ok());
        assert!(server.try_accept().is_some());

        let refused: Vec<bool> = server.attempts().iter().map(|a| a.refused).collect();
        assert_eq!(refused, vec![true, true, false]);
    }

    #[tokio::test]
    async fn peer_close_ends_client_stream() {
        let (connector, mut server) = MemoryConnector::new();
        let mut link = connector.connect("mem://a").await.unwrap();
        let peer = server.accept().await.unwrap();
        assert_eq!(peer.endpoint(), "mem://a");

        peer.send_text("one");
        peer.close();

        assert_eq!(link.recv().await.unwrap().unwrap(), "one");
        assert!(link.recv().await.is_none());
        assert!(matches!(link.send("x".into()).await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn client_close_ends_peer_stream() {
        let (connector, mut server) = MemoryConnector::new();
        let mut link = connector.connect("mem://a").await.unwrap();
        let mut peer = server.accept().await.unwrap();

        link.close().await;
        assert_eq!(peer.recv_text().await, None);
        assert!(!peer.send_text("late"));
    }
}
