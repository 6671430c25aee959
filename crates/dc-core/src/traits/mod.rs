//! Core trait definitions

mod process;

pub use process::{ProcessControl, ProcessInput, ProcessLauncher, ProcessOutput, SpawnedProcess};
