//! State reconciler - merges server events into the local snapshot
//!
//! The reconciler never computes rewards, never advances progress on its own
//! and never predicts outcomes. It keeps the most recent server truth plus a
//! few short-lived cosmetic signals.
//!
//! # Dispatch
//!
//! | Event | GameState | Signals |
//! |-------|-----------|---------|
//! | `Status` | replaced wholesale | - |
//! | `ActivityTick` | - | progress = p |
//! | `ResourceCollected` | xp/level overwritten, inventory[id] = quantity | progress = 0, notification 2s |
//! | `LevelUp` | - | level-up flag + notification 3s |
//! | `ActivityStarted` | current activity = id | - |
//! | `ActivityStopped` | current activity cleared | progress = 0 |
//! | `Error` | - | notification 3s |
//! | `Unknown` | - | - |
//!
//! # Example
//!
//! ```
//! use idle_miner_core::{reduce, CoreEvent, CoreState, ServerEvent};
//! use idle_miner_core::types::GameState;
//!
//! let state = CoreState::new();
//! let state = reduce(state, CoreEvent::Server(ServerEvent::Status(GameState::new("mining"))), 0);
//! let state = reduce(state, CoreEvent::Server(ServerEvent::ActivityTick { progress: 0.5 }), 10);
//!
//! let view = state.view(10);
//! assert!(view.game.is_some());
//! assert_eq!(view.mining_progress, 0.5);
//! ```

use crate::event::{CoreEvent, ResourceCollected, ServerEvent};
use crate::signal::Expiring;
use crate::types::{
    ConnectionState, GameState, DEFAULT_SKILL, ERROR_NOTIFICATION_MS, LEVEL_UP_DISPLAY_MS,
    RESOURCE_NOTIFICATION_MS,
};
use crate::view::ClientView;

/// Everything the reconciler owns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoreState {
    /// Mirror of the transport status, for the view only.
    pub connection: ConnectionState,
    /// Absent until the first `status`.
    pub game: Option<GameState>,
    pub mining_progress: f64,
    pub notification: Expiring<String>,
    /// Holds the announced level while the flag is up.
    pub level_up: Expiring<u32>,
}

/// Pure reducer: `(prior, event) -> next`.
pub fn reduce(mut prior: CoreState, event: CoreEvent, now_ms: u64) -> CoreState {
    prior.apply(event, now_ms);
    prior
}

impl CoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event at logical time `now_ms`.
    pub fn apply(&mut self, event: CoreEvent, now_ms: u64) {
        self.sweep(now_ms);

        match event {
            CoreEvent::Connection(state) => self.connection = state,
            CoreEvent::Server(event) => self.apply_server(event, now_ms),
            CoreEvent::Tick => {}
        }
    }

    fn apply_server(&mut self, event: ServerEvent, now_ms: u64) {
        match event {
            ServerEvent::Status(game) => {
                self.game = Some(game);
            }
            ServerEvent::ActivityTick { progress } => {
                self.mining_progress = clamp_ratio(progress);
            }
            ServerEvent::ResourceCollected(collected) => {
                self.mining_progress = 0.0;
                self.notification
                    .set(collected_text(&collected), now_ms, RESOURCE_NOTIFICATION_MS);

                if let Some(game) = self.game.as_mut() {
                    let level = collected.level.max(1);
                    let level_changed = game.level != level;
                    game.total_xp = collected.total_xp;
                    game.level = level;
                    game.xp_in_level = collected.xp_in_level;
                    game.xp_needed = collected.xp_needed;
                    game.inventory.insert(collected.resource, collected.quantity);
                    if level_changed {
                        game.refresh_unlocks();
                    }
                }
            }
            ServerEvent::LevelUp { new_level, skill } => {
                let skill = skill
                    .or_else(|| self.game.as_ref().map(|g| g.skill_type.clone()))
                    .unwrap_or_else(|| DEFAULT_SKILL.to_string());
                self.level_up.set(new_level, now_ms, LEVEL_UP_DISPLAY_MS);
                self.notification
                    .set(level_up_text(&skill, new_level), now_ms, LEVEL_UP_DISPLAY_MS);
            }
            ServerEvent::ActivityStarted { resource } => {
                if let Some(game) = self.game.as_mut() {
                    game.current_activity = Some(resource);
                }
            }
            ServerEvent::ActivityStopped => {
                self.mining_progress = 0.0;
                if let Some(game) = self.game.as_mut() {
                    game.current_activity = None;
                }
            }
            ServerEvent::Error { message } => {
                self.notification.set(message, now_ms, ERROR_NOTIFICATION_MS);
            }
            ServerEvent::Unknown { .. } => {}
        }
    }

    /// Clear signals whose deadline has passed.
    pub fn sweep(&mut self, now_ms: u64) {
        self.notification.sweep(now_ms);
        self.level_up.sweep(now_ms);
    }

    /// Earliest pending signal expiry, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.notification.expires_at(), self.level_up.expires_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn view(&self, now_ms: u64) -> ClientView {
        ClientView {
            connection: self.connection,
            game: self.game.clone(),
            mining_progress: self.mining_progress,
            notification: self.notification.get(now_ms).cloned(),
            level_up: self.level_up.is_active(now_ms),
        }
    }
}

fn clamp_ratio(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

fn collected_text(collected: &ResourceCollected) -> String {
    let name = collected
        .resource_name
        .as_deref()
        .unwrap_or(collected.resource.as_str());
    format!("+1 {}! +{} XP", name, collected.xp_gained)
}

fn level_up_text(skill: &str, level: u32) -> String {
    let mut chars = skill.chars();
    let skill = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("LEVEL UP! {} Level {}!", skill, level)
}
