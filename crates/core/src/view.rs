//! Read-only snapshot handed to the presentation layer.

use crate::types::{ConnectionState, GameState};

/// What the UI should show while it has nothing (or something) to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not connected and no snapshot yet.
    Connecting,
    /// Connected, waiting for the first `status`.
    Loading,
    /// A snapshot exists. Stays `Ready` across reconnects so the screen does
    /// not flash back to a loading state.
    Ready,
}

/// The tuple the UI consumes every render tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientView {
    pub connection: ConnectionState,
    pub game: Option<GameState>,
    pub mining_progress: f64,
    pub notification: Option<String>,
    pub level_up: bool,
}

impl ClientView {
    pub fn phase(&self) -> Phase {
        match (&self.game, self.connection) {
            (Some(_), _) => Phase::Ready,
            (None, ConnectionState::Connected) => Phase::Loading,
            (None, _) => Phase::Connecting,
        }
    }

    /// Resource currently being collected, if any.
    pub fn current_activity(&self) -> Option<&str> {
        self.game
            .as_ref()
            .and_then(|g| g.current_activity.as_ref())
            .map(|id| id.as_str())
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            game: None,
            mining_progress: 0.0,
            notification: None,
            level_up: false,
        }
    }
}
