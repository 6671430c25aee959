//! HTTP server
//!
//! Serves the WebSocket endpoint and the response middleware.

mod listener;
mod middleware;
mod router;

pub use listener::{ConsoleServer, SESSION_DRAIN_TIMEOUT};
pub use router::{build_router, WS_PATH};
