//! Transport-level frames
//!
//! The protocol rides on a message-framed transport (WebSocket). A frame is
//! either text or binary; the transport's own message boundary is the only
//! framing applied.

use bytes::Bytes;

/// One transport message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message
    Text(String),
    /// Binary message
    Binary(Bytes),
}

impl Frame {
    /// Raw payload bytes of this frame
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(data) => data,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
