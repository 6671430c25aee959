//! dc-core: Core abstractions and configuration for docker-console
//!
//! This crate provides the shared types, the error taxonomy, the process
//! launcher traits, and the configuration structures used by the launcher
//! and the server.

pub mod claim;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use claim::{AlreadyClaimed, OnceClaim};
pub use error::ConsoleError;
pub use types::{ContainerId, SessionId};
