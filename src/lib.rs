//! Idle Miner (workspace facade crate).
//!
//! Re-exports the workspace crates under `idle_miner::{core,transport,types}` and
//! hosts the line-oriented console used by the `idle-miner` binary.

pub mod console;

pub use idle_miner_core as core;
pub use idle_miner_transport as transport;
pub use idle_miner_types as types;
