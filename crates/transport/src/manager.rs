//! Transport manager - one logical connection that keeps itself alive
//!
//! The manager is a thin handle. A background supervisor task owns the link
//! and walks this cycle:
//!
//! ```text
//! Idle --connect--> Dialing --ok--> Session --close/error--> Backoff
//!                      |                                        |
//!                      +------------------fail----------------->+
//!                                                               |
//!            Dialing <------------- fixed delay ----------------+
//! ```
//!
//! The reconnection delay is constant, with no growth and no cap, and the
//! cycle repeats until [`TransportManager::shutdown`].
//!
//! Status transitions are published both on a `watch` channel (for
//! synchronous `status()` reads) and as [`TransportEvent::Status`] on the
//! event stream, interleaved with inbound messages in arrival order.

use std::ops::ControlFlow;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::connector::{Connector, Link};
use crate::core::CoreEvent;
use crate::error::{Result, TransportError};
use crate::protocol::{parse_message, ClientMessage, ParsedMessage};
use crate::types::ConnectionState;
use crate::wire_log::{Direction, WireLog};

/// What the manager emits to its single consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Status(ConnectionState),
    Message(ParsedMessage),
}

impl From<TransportEvent> for CoreEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Status(state) => CoreEvent::Connection(state),
            TransportEvent::Message(message) => CoreEvent::Server(message.into()),
        }
    }
}

#[derive(Debug)]
enum Control {
    Connect,
    Send(String),
}

/// Handle to the supervisor task.
pub struct TransportManager {
    control_tx: mpsc::UnboundedSender<Control>,
    status_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TransportManager {
    /// Spawn the supervisor on the current runtime. Nothing is dialed until
    /// [`connect`](Self::connect).
    pub fn new<C: Connector>(
        connector: C,
        config: TransportConfig,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let wire_log = config.wire_log_path.clone().map(WireLog::open);
        let supervisor = Supervisor {
            connector,
            config,
            status_tx,
            events_tx,
            wire_log,
        };
        let task = tokio::spawn(supervisor.run(control_rx, shutdown_rx));

        let manager = Self {
            control_tx,
            status_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        };
        (manager, events_rx)
    }

    /// Start the connection cycle.
    ///
    /// Idempotent: ignored while dialing, while connected, and while a
    /// reconnection is already scheduled.
    pub fn connect(&self) -> Result<()> {
        self.control_tx
            .send(Control::Connect)
            .map_err(|_| TransportError::Disposed)
    }

    /// Transmit `message` if the link is open.
    ///
    /// Nothing is queued: a message sent while not connected is dropped and
    /// reported as [`TransportError::NotConnected`].
    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        let status = self.status();
        if !status.is_connected() {
            warn!(%status, ?message, "send while not connected; message dropped");
            return Err(TransportError::NotConnected(status));
        }

        let text = serde_json::to_string(message)?;
        self.control_tx
            .send(Control::Send(text))
            .map_err(|_| TransportError::Disposed)
    }

    pub fn status(&self) -> ConnectionState {
        *self.status_rx.borrow()
    }

    pub fn status_signal(&self) -> watch::Receiver<ConnectionState> {
        self.status_rx.clone()
    }

    /// Cancel any pending reconnection, close the link, and wait for the
    /// supervisor to publish `Disconnected` and exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "transport supervisor ended abnormally");
            }
        }
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Phase<L> {
    Idle,
    Dialing,
    Session(L),
    Backoff,
}

struct Supervisor<C> {
    connector: C,
    config: TransportConfig,
    status_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::Sender<TransportEvent>,
    wire_log: Option<WireLog>,
}

impl<C: Connector> Supervisor<C> {
    async fn run(
        self,
        mut control_rx: mpsc::UnboundedReceiver<Control>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let mut phase = Phase::Idle;

        'run: loop {
            phase = match phase {
                Phase::Idle => tokio::select! {
                    _ = &mut shutdown_rx => break 'run,
                    cmd = control_rx.recv() => match cmd {
                        Some(Control::Connect) => Phase::Dialing,
                        other => {
                            if !self.reject(other, "idle") {
                                break 'run;
                            }
                            Phase::Idle
                        }
                    },
                },

                Phase::Dialing => {
                    if self
                        .set_status(ConnectionState::Connecting, &mut shutdown_rx)
                        .await
                        .is_break()
                    {
                        break 'run;
                    }
                    debug!(endpoint = %self.config.endpoint, "dialing");

                    let dial = self.connector.connect(&self.config.endpoint);
                    tokio::pin!(dial);

                    let result = loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => break 'run,
                            result = &mut dial => break result,
                            cmd = control_rx.recv() => {
                                if !self.reject(cmd, "connecting") {
                                    break 'run;
                                }
                            }
                        }
                    };

                    match result {
                        Ok(mut link) => {
                            info!(endpoint = %self.config.endpoint, "connected");
                            if self
                                .set_status(ConnectionState::Connected, &mut shutdown_rx)
                                .await
                                .is_break()
                            {
                                link.close().await;
                                break 'run;
                            }
                            Phase::Session(link)
                        }
                        Err(e) => {
                            info!(endpoint = %self.config.endpoint, error = %e, "connect failed");
                            if self
                                .set_status(ConnectionState::Disconnected, &mut shutdown_rx)
                                .await
                                .is_break()
                            {
                                break 'run;
                            }
                            Phase::Backoff
                        }
                    }
                }

                Phase::Session(mut link) => {
                    let reason = loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => {
                                link.close().await;
                                break 'run;
                            }
                            frame = link.recv() => match frame {
                                Some(Ok(text)) => {
                                    if self.deliver(&text, &mut shutdown_rx).await.is_break() {
                                        link.close().await;
                                        break 'run;
                                    }
                                }
                                Some(Err(e)) => break e.to_string(),
                                None => break "closed by peer".to_string(),
                            },
                            cmd = control_rx.recv() => match cmd {
                                Some(Control::Send(text)) => {
                                    self.record(Direction::Outbound, &text);
                                    if let Err(e) = link.send(text).await {
                                        break e.to_string();
                                    }
                                }
                                Some(Control::Connect) => {
                                    debug!("connect ignored: already connected");
                                }
                                None => {
                                    link.close().await;
                                    break 'run;
                                }
                            },
                        }
                    };

                    warn!(endpoint = %self.config.endpoint, %reason, "connection lost");
                    if self
                        .set_status(ConnectionState::Disconnected, &mut shutdown_rx)
                        .await
                        .is_break()
                    {
                        break 'run;
                    }
                    Phase::Backoff
                }

                Phase::Backoff => {
                    let delay = self.config.reconnect_delay;
                    info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");

                    let sleep = tokio::time::sleep(delay);
                    tokio::pin!(sleep);

                    loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => break 'run,
                            _ = &mut sleep => break,
                            cmd = control_rx.recv() => {
                                if !self.reject(cmd, "reconnect scheduled") {
                                    break 'run;
                                }
                            }
                        }
                    }
                    Phase::Dialing
                }
            };
        }

        self.publish_final_status();
        debug!("transport supervisor stopped");
    }

    /// Handle a control message while no link is open. Returns false once
    /// the manager handle is gone.
    fn reject(&self, cmd: Option<Control>, phase: &'static str) -> bool {
        match cmd {
            Some(Control::Connect) => {
                debug!(phase, "connect ignored");
                true
            }
            Some(Control::Send(text)) => {
                warn!(phase, frame = %text, "link not open; outbound frame dropped");
                true
            }
            None => false,
        }
    }

    async fn deliver(
        &self,
        text: &str,
        shutdown_rx: &mut oneshot::Receiver<()>,
    ) -> ControlFlow<()> {
        self.record(Direction::Inbound, text);

        match parse_message(text) {
            Ok(message) => {
                if let ParsedMessage::Unknown { kind } = &message {
                    debug!(%kind, "unknown message kind");
                }
                self.emit(TransportEvent::Message(message), shutdown_rx).await
            }
            Err(e) => {
                warn!(error = %e, frame = %text, "dropping malformed frame");
                ControlFlow::Continue(())
            }
        }
    }

    async fn set_status(
        &self,
        state: ConnectionState,
        shutdown_rx: &mut oneshot::Receiver<()>,
    ) -> ControlFlow<()> {
        if *self.status_tx.borrow() == state {
            return ControlFlow::Continue(());
        }
        self.status_tx.send_replace(state);
        self.emit(TransportEvent::Status(state), shutdown_rx).await
    }

    /// Wait for room in the event channel, or break if shutdown arrives first.
    async fn emit(
        &self,
        event: TransportEvent,
        shutdown_rx: &mut oneshot::Receiver<()>,
    ) -> ControlFlow<()> {
        tokio::select! {
            biased;
            _ = shutdown_rx => ControlFlow::Break(()),
            permit = self.events_tx.reserve() => {
                match permit {
                    Ok(permit) => permit.send(event),
                    Err(_) => debug!("event channel closed, receiver dropped"),
                }
                ControlFlow::Continue(())
            }
        }
    }

    /// Last word on teardown. Never waits: if the consumer is not reading,
    /// the `watch` value still reports `Disconnected`.
    fn publish_final_status(&self) {
        if *self.status_tx.borrow() == ConnectionState::Disconnected {
            return;
        }
        self.status_tx.send_replace(ConnectionState::Disconnected);
        if let Err(e) = self
            .events_tx
            .try_send(TransportEvent::Status(ConnectionState::Disconnected))
        {
            debug!(error = %e, "final status not queued");
        }
    }

    fn record(&self, direction: Direction, text: &str) {
        if let Some(log) = &self.wire_log {
            log.record(direction, text);
        }
    }
}
