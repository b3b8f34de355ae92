//! Events consumed by the reconciler and commands produced by the UI.

use crate::types::{ConnectionState, GameState, ResourceId};

/// A server-pushed event, already decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Full snapshot; replaces everything known so far.
    Status(GameState),
    /// Server-reported progress of the running activity.
    ActivityTick { progress: f64 },
    ResourceCollected(ResourceCollected),
    LevelUp {
        new_level: u32,
        skill: Option<String>,
    },
    ActivityStarted { resource: ResourceId },
    ActivityStopped,
    /// Domain error reported by the server (e.g. level too low).
    Error { message: String },
    /// A message kind this client does not know about.
    Unknown { kind: String },
}

/// One unit collected, with the authoritative totals after the award.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCollected {
    pub resource: ResourceId,
    pub resource_name: Option<String>,
    pub xp_gained: u64,
    pub total_xp: u64,
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_needed: u64,
    /// Absolute quantity now held, not a delta.
    pub quantity: u64,
}

/// Everything that can advance [`crate::CoreState`].
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    Connection(ConnectionState),
    Server(ServerEvent),
    /// Time passed; only expires signals.
    Tick,
}

impl From<ServerEvent> for CoreEvent {
    fn from(event: ServerEvent) -> Self {
        CoreEvent::Server(event)
    }
}

impl From<ConnectionState> for CoreEvent {
    fn from(state: ConnectionState) -> Self {
        CoreEvent::Connection(state)
    }
}

/// The two commands the UI may issue.
///
/// Neither touches local state; the server's echo does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartActivity(ResourceId),
    StopActivity,
}
