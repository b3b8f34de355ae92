//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the client.
//! All types are plain data with no I/O, making them usable in any context
//! (reconciler, wire protocol, console rendering).
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_RECONNECT_DELAY_MS` | 3000 | Fixed wait before redialing a dropped connection |
//! | `RESOURCE_NOTIFICATION_MS` | 2000 | Lifetime of the "+1 ore" notification |
//! | `LEVEL_UP_DISPLAY_MS` | 3000 | Lifetime of the level-up flag and its notification |
//! | `ERROR_NOTIFICATION_MS` | 3000 | Lifetime of a server error notification |
//!
//! # Examples
//!
//! ```
//! use idle_miner_types::{ConnectionState, GameState, ResourceId};
//!
//! let mut game = GameState::new("mining");
//! assert_eq!(game.level, 1);
//! assert!(game.is_idle());
//!
//! game.inventory.insert(ResourceId::from("copper"), 3);
//! assert_eq!(game.quantity("copper"), 3);
//! assert_eq!(game.quantity("iron"), 0);
//!
//! assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
//! assert_eq!(ConnectionState::Connected.as_str(), "connected");
//! ```

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Fixed reconnection delay (3 seconds, no backoff growth)
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Notification lifetime after a resource is collected
pub const RESOURCE_NOTIFICATION_MS: u64 = 2000;

/// Level-up flag and notification lifetime
pub const LEVEL_UP_DISPLAY_MS: u64 = 3000;

/// Server error notification lifetime
pub const ERROR_NOTIFICATION_MS: u64 = 3000;

/// Player identifier used when no real identity is available (dev mode).
pub const DEBUG_PLAYER_ID: &str = "12345";

/// Skill name assumed when the server does not say.
pub const DEFAULT_SKILL: &str = "mining";

/// Identifier of a collectible resource (e.g. `"copper"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ResourceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lifecycle of the single logical connection.
///
/// The cycle goes: Disconnected → Connecting → Connected → Disconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Convert to lowercase string representation
    ///
    /// # Examples
    ///
    /// ```
    /// use idle_miner_types::ConnectionState;
    ///
    /// assert_eq!(ConnectionState::Disconnected.as_str(), "disconnected");
    /// assert_eq!(ConnectionState::Connecting.as_str(), "connecting");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resource's unlock flag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnlockSource {
    /// Sent explicitly by the server; never overridden locally.
    Server,
    /// Computed from the player's level (`level >= level_required`).
    Derived,
}

/// Per-resource metadata plus unlock state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub name: String,
    pub level_required: u32,
    pub xp_per_unit: u64,
    pub duration_secs: f64,
    pub glyph: String,
    pub color: String,
    pub description: String,
    /// Quantity as last reported inside the catalog itself.
    pub quantity: u64,
    pub unlocked: bool,
    pub unlock_source: UnlockSource,
}

impl ResourceDescriptor {
    /// Re-derive the unlock flag for `level`.
    ///
    /// Server-provided flags are left untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use idle_miner_types::{ResourceDescriptor, UnlockSource};
    ///
    /// let mut iron = ResourceDescriptor::locked_at("iron", 15);
    /// assert!(!iron.unlocked);
    /// iron.refresh_unlock(15);
    /// assert!(iron.unlocked);
    ///
    /// iron.unlock_source = UnlockSource::Server;
    /// iron.unlocked = false;
    /// iron.refresh_unlock(99);
    /// assert!(!iron.unlocked);
    /// ```
    pub fn refresh_unlock(&mut self, level: u32) {
        if self.unlock_source == UnlockSource::Derived {
            self.unlocked = level >= self.level_required;
        }
    }

    /// Minimal descriptor gated at `level_required`, unlock derived and
    /// currently locked. Metadata fields are empty.
    pub fn locked_at(id: impl Into<ResourceId>, level_required: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            level_required,
            xp_per_unit: 0,
            duration_secs: 0.0,
            glyph: String::new(),
            color: String::new(),
            description: String::new(),
            quantity: 0,
            unlocked: false,
            unlock_source: UnlockSource::Derived,
        }
    }
}

/// Authoritative game snapshot as last pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub skill_type: String,
    pub level: u32,
    pub total_xp: u64,
    pub xp_in_level: u64,
    pub xp_needed: u64,
    pub current_activity: Option<ResourceId>,
    pub activity_started_at: Option<DateTime<Utc>>,
    pub catalog: Vec<ResourceDescriptor>,
    pub inventory: BTreeMap<ResourceId, u64>,
}

impl GameState {
    /// Empty level-1 snapshot for `skill_type`.
    pub fn new(skill_type: impl Into<String>) -> Self {
        Self {
            skill_type: skill_type.into(),
            level: 1,
            total_xp: 0,
            xp_in_level: 0,
            xp_needed: 0,
            current_activity: None,
            activity_started_at: None,
            catalog: Vec::new(),
            inventory: BTreeMap::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_activity.is_none()
    }

    /// Quantity held of `id` (0 when absent).
    pub fn quantity(&self, id: &str) -> u64 {
        self.inventory.get(id).copied().unwrap_or(0)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.catalog.iter().find(|r| r.id == id)
    }

    pub fn unlocked_resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.catalog.iter().filter(|r| r.unlocked)
    }

    /// Progress through the current level in `[0, 1]`.
    ///
    /// `xp_needed == 0` is the max-level case and counts as complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use idle_miner_types::GameState;
    ///
    /// let mut game = GameState::new("mining");
    /// game.xp_in_level = 25;
    /// game.xp_needed = 100;
    /// assert_eq!(game.level_progress(), 0.25);
    ///
    /// game.xp_needed = 0;
    /// assert_eq!(game.level_progress(), 1.0);
    /// ```
    pub fn level_progress(&self) -> f64 {
        if self.xp_needed == 0 {
            return 1.0;
        }
        (self.xp_in_level as f64 / self.xp_needed as f64).clamp(0.0, 1.0)
    }

    /// Re-derive every locally computed unlock flag against the current level.
    pub fn refresh_unlocks(&mut self) {
        let level = self.level;
        for resource in &mut self.catalog {
            resource.refresh_unlock(level);
        }
    }
}
