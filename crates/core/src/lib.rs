//! Core reconciliation module - pure, deterministic, and testable
//!
//! This module merges server-pushed events into the local game snapshot.
//! It has **zero dependencies** on networking, timers, or I/O, making it:
//!
//! - **Deterministic**: The same events at the same logical times give the same view
//! - **Testable**: Every dispatch rule is a plain function call
//! - **Portable**: Runs under the async runtime, a benchmark, or a unit test alike
//!
//! # Module Structure
//!
//! - [`event`]: Decoded server events, connection changes, and UI commands
//! - [`reconciler`]: The reducer and the state it owns
//! - [`signal`]: Values that clear themselves after a deadline
//! - [`view`]: Read-only snapshot for the presentation layer
//!
//! # Rules
//!
//! - **Server-authoritative**: XP, level, and quantities are always overwritten, never summed
//! - **No prediction**: Commands do not touch local state; the server echo does
//! - **Latest write wins**: A newer notification owns its own expiry
//!
//! # Timing
//!
//! Time is a logical millisecond counter passed into every call. The caller
//! schedules a [`CoreEvent::Tick`] at [`CoreState::next_deadline`] so expired
//! signals are swept even when the server is quiet.

pub mod event;
pub mod reconciler;
pub mod signal;
pub mod view;

pub use idle_miner_types as types;

// Re-export commonly used types for convenience
pub use event::{Command, CoreEvent, ResourceCollected, ServerEvent};
pub use reconciler::{reduce, CoreState};
pub use signal::Expiring;
pub use view::{ClientView, Phase};
