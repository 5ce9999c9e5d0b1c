//! Resilient client for the Rust+ companion protocol.
//!
//! ARCHITECTURE
//! ============
//! - `protocol` (sibling crate): protobuf envelopes and payloads.
//! - [`transport`]: one websocket link at a time, direct or via the relay.
//! - [`sequencer`]: sequence ids and the pending-request table.
//! - [`supervisor`]: the task that owns connection state and reconnects.
//! - [`client`]: the cloneable request broker handle.
//! - [`pairing`]: `.env` upsert from pairing notifications.

pub mod client;
pub mod config;
pub mod error;
pub mod pairing;
pub mod sequencer;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::{ClientConfig, ConfigError, Credentials};
pub use error::{ClientError, TransportError};
pub use pairing::{Pairing, PairingError};
pub use supervisor::{ClientEvent, ConnectionState};
pub use transport::{Dialer, Endpoint, WsDialer};

pub use protocol;
