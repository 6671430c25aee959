//! Session init request
//!
//! The first frame a client sends after the upgrade. It names the container
//! to attach to and carries the fingerprint that gates session creation.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::frame::Frame;

/// The handshake message that opens a session
///
/// Missing fields decode as empty strings so that an incomplete request is
/// rejected by the credential check rather than by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitRequest {
    /// Target identifier
    #[serde(rename = "t_id")]
    pub target_id: String,
    /// Session identifier
    #[serde(rename = "s_id")]
    pub session_id: String,
    /// Client identifier; names the container to attach to
    #[serde(rename = "c_id")]
    pub client_id: String,
    /// Hex digest binding the three identifiers
    #[serde(rename = "md5")]
    pub fingerprint: String,
}

impl InitRequest {
    /// Create a new init request
    pub fn new(
        target_id: impl Into<String>,
        session_id: impl Into<String>,
        client_id: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            session_id: session_id.into(),
            client_id: client_id.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Decode an init request from the first frame of a connection
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        serde_json::from_slice(frame.as_bytes()).map_err(ProtocolError::InvalidInit)
    }

    /// Encode as a JSON text frame
    pub fn to_frame(&self) -> Frame {
        // A struct of plain strings always serializes.
        Frame::Text(serde_json::to_string(self).unwrap_or_default())
    }
}
