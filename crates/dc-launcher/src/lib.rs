//! dc-launcher: Process launcher for docker-console
//!
//! Starts a shell inside a container on a freshly allocated pseudo-terminal
//! and exposes its I/O and lifecycle through the `dc_core` process traits.

pub mod docker;
pub mod pty;

pub use docker::DockerExecLauncher;
pub use pty::spawn_pty;
