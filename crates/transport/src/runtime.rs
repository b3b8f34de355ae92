//! Runtime client - wires the transport to the reconciler
//!
//! Two tasks cooperate:
//!
//! - the transport supervisor (owned by [`TransportManager`]) produces
//!   [`TransportEvent`]s on a bounded channel;
//! - the reconcile loop is the single consumer of that channel. It owns the
//!   [`CoreState`], applies every event in arrival order, and wakes on its own
//!   at the next signal deadline so expired notifications are cleared even
//!   when the server is quiet.
//!
//! The latest [`ClientView`] is published on a `watch` channel.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::connector::Connector;
use crate::core::{ClientView, Command, CoreEvent, CoreState};
use crate::error::Result;
use crate::manager::{TransportEvent, TransportManager};
use crate::protocol::ClientMessage;
use crate::types::{ConnectionState, ResourceId};

pub struct Client {
    transport: TransportManager,
    view_rx: watch::Receiver<ClientView>,
    task: JoinHandle<()>,
}

impl Client {
    /// Spawn the transport and reconcile tasks and begin connecting.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start<C: Connector>(connector: C, config: &ClientConfig) -> Self {
        let (transport, events) = TransportManager::new(connector, config.transport());
        let (view_tx, view_rx) = watch::channel(ClientView::default());
        let task = tokio::spawn(reconcile_loop(events, view_tx));

        if let Err(e) = transport.connect() {
            warn!(error = %e, "initial connect failed");
        }

        Self {
            transport,
            view_rx,
            task,
        }
    }

    /// Ask the server to start collecting `resource`.
    ///
    /// Local state only changes once the server confirms with
    /// `mining_started`.
    pub fn start_activity(&self, resource: impl Into<ResourceId>) -> Result<()> {
        self.dispatch(Command::StartActivity(resource.into()))
    }

    pub fn stop_activity(&self) -> Result<()> {
        self.dispatch(Command::StopActivity)
    }

    pub fn dispatch(&self, command: Command) -> Result<()> {
        self.transport.send(&ClientMessage::from(&command))
    }

    /// Latest published view.
    pub fn view(&self) -> ClientView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientView> {
        self.view_rx.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.status()
    }

    /// Dispose the transport, then let the reconcile loop drain and stop.
    pub async fn shutdown(self) {
        self.transport.shutdown().await;
        if let Err(e) = self.task.await {
            debug!(error = %e, "reconcile loop ended abnormally");
        }
    }
}

async fn reconcile_loop(
    mut events: mpsc::Receiver<TransportEvent>,
    view_tx: watch::Sender<ClientView>,
) {
    let origin = Instant::now();
    let now_ms = || origin.elapsed().as_millis() as u64;
    let mut state = CoreState::new();

    loop {
        let event = match state.next_deadline() {
            Some(deadline) => {
                let wake = origin + Duration::from_millis(deadline);
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => CoreEvent::from(event),
                        None => break,
                    },
                    _ = tokio::time::sleep_until(wake) => CoreEvent::Tick,
                }
            }
            None => match events.recv().await {
                Some(event) => CoreEvent::from(event),
                None => break,
            },
        };

        let now = now_ms();
        state.apply(event, now);
        let next = state.view(now);
        view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    debug!("reconcile loop stopped");
}
