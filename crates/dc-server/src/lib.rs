//! dc-server: Browser terminal server for docker containers
//!
//! Accepts WebSocket connections, authenticates the first frame, starts a
//! shell inside the requested container on a pseudo-terminal, and bridges
//! terminal I/O between the two until either side goes away.

pub mod auth;
pub mod bridge;
pub mod server;
pub mod state;

pub use server::{build_router, ConsoleServer};
pub use state::{AppState, ServerIdentity};
