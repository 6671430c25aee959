//! dc-protocol: Wire protocol for docker-console terminal sessions
//!
//! This crate defines the messages exchanged between a browser terminal
//! and the server over a single WebSocket connection: the JSON init
//! request that opens a session, and the marker-prefixed frames that
//! carry terminal I/O and control signals afterwards.

pub mod error;
pub mod frame;
pub mod init;
pub mod message;

pub use error::ProtocolError;
pub use frame::Frame;
pub use init::InitRequest;
pub use message::{ClientMessage, ServerMessage, TerminalSize};
