//! Transport and runtime for the idle-miner client
//!
//! This crate owns everything with I/O or timers:
//!
//! - [`manager`]: the reconnecting transport with a fixed retry delay
//! - [`connector`]: the socket seam ([`WsConnector`] for production)
//! - [`memory`]: an in-process connector for tests and demos
//! - [`protocol`]: the JSON wire format
//! - [`runtime`]: the [`Client`] that feeds transport events to the reconciler
//! - [`config`]: environment-driven configuration
//! - [`wire_log`]: optional append-only frame log
//!
//! # Example
//!
//! ```no_run
//! use idle_miner_transport::{Client, ClientConfig, WsConnector};
//!
//! # async fn run() {
//! let client = Client::start(WsConnector, &ClientConfig::from_env());
//! let mut views = client.subscribe();
//!
//! while views.changed().await.is_ok() {
//!     let view = views.borrow_and_update().clone();
//!     if view.game.is_some() {
//!         let _ = client.start_activity("copper");
//!         break;
//!     }
//! }
//! client.shutdown().await;
//! # }
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod manager;
pub mod memory;
pub mod protocol;
pub mod runtime;
pub mod wire_log;

pub use idle_miner_core as core;
pub use idle_miner_types as types;

pub use config::{ClientConfig, TransportConfig};
pub use connector::{Connector, Link, WsConnector};
pub use error::{Result, TransportError};
pub use manager::{TransportEvent, TransportManager};
pub use memory::{MemoryConnector, MemoryPeer, MemoryServer};
pub use protocol::{parse_message, ClientMessage, ParsedMessage, ServerMessage};
pub use runtime::Client;
