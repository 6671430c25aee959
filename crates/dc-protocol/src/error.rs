//! Protocol error types

use thiserror::Error;

/// Errors that can occur while decoding protocol frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A text frame arrived with no type marker
    #[error("Empty frame")]
    Empty,

    /// Unknown message type marker
    #[error("Unknown message type: {0:#04x}")]
    UnknownMarker(u8),

    /// Resize payload could not be parsed
    #[error("Invalid resize payload: {0}")]
    InvalidResize(#[source] serde_json::Error),

    /// Control payload could not be parsed
    #[error("Invalid payload for message type {marker:#04x}: {reason}")]
    InvalidPayload { marker: u8, reason: String },

    /// Init request could not be parsed
    #[error("Invalid init request: {0}")]
    InvalidInit(#[source] serde_json::Error),
}
