//! Pure Rust async client for the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol),
//! with support for multi-packet responses and the chat stream of Squad servers.
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod packet;
pub mod transport;

pub use client::{Client, Response};
pub use config::ClientConfig;
pub use error::{ProtocolError, RconError};
