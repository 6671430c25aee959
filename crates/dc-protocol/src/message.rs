//! Message types for the docker-console protocol
//!
//! After the init handshake every frame on the connection is one of the
//! messages below. Text frames start with a single ASCII type marker; the
//! rest of the frame is the payload.
//!
//! # Client → server
//!
//! | Marker | Message | Payload |
//! |--------|---------|---------|
//! | `0`    | Input   | raw keystroke bytes |
//! | `1`    | Ping    | ignored |
//! | `2`    | Resize  | `{"columns": u16, "rows": u16}` |
//!
//! A binary frame from the client is input with no marker.
//!
//! # Server → client
//!
//! Terminal output is sent as binary frames carrying raw bytes. Control
//! replies use text frames:
//!
//! | Marker | Message        | Payload |
//! |--------|----------------|---------|
//! | `1`    | Pong           | none |
//! | `2`    | SetWindowTitle | title text |
//! | `3`    | SetPreferences | JSON object |
//! | `4`    | SetReconnect   | delay in seconds |

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::frame::Frame;

/// Terminal dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    #[serde(rename = "columns", alias = "cols")]
    pub cols: u16,
}

impl TerminalSize {
    /// Create a new terminal size
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Default terminal size (24x80)
    pub fn default_size() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::default_size()
    }
}

/// Type marker for client messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientMessageType {
    /// Keystrokes for the process
    Input = b'0',
    /// Keepalive
    Ping = b'1',
    /// Terminal resize
    Resize = b'2',
}

impl ClientMessageType {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'0' => Some(Self::Input),
            b'1' => Some(Self::Ping),
            b'2' => Some(Self::Resize),
            _ => None,
        }
    }
}

/// Type marker for server control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerMessageType {
    /// Keepalive reply
    Pong = b'1',
    /// Window title for the browser tab
    SetWindowTitle = b'2',
    /// Terminal emulator preferences
    SetPreferences = b'3',
    /// Reconnect delay
    SetReconnect = b'4',
}

impl ServerMessageType {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'1' => Some(Self::Pong),
            b'2' => Some(Self::SetWindowTitle),
            b'3' => Some(Self::SetPreferences),
            b'4' => Some(Self::SetReconnect),
            _ => None,
        }
    }
}

/// Messages sent by the browser client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Raw bytes to forward verbatim to the process
    Input(Bytes),
    /// Keepalive ping
    Ping,
    /// Resize the terminal
    Resize(TerminalSize),
}

impl ClientMessage {
    /// Decode a client frame
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let text = match frame {
            Frame::Binary(data) => return Ok(ClientMessage::Input(data.clone())),
            Frame::Text(text) => text.as_bytes(),
        };

        let (&marker, payload) = text.split_first().ok_or(ProtocolError::Empty)?;
        match ClientMessageType::from_u8(marker) {
            Some(ClientMessageType::Input) => {
                Ok(ClientMessage::Input(Bytes::copy_from_slice(payload)))
            }
            Some(ClientMessageType::Ping) => Ok(ClientMessage::Ping),
            Some(ClientMessageType::Resize) => serde_json::from_slice(payload)
                .map(ClientMessage::Resize)
                .map_err(ProtocolError::InvalidResize),
            None => Err(ProtocolError::UnknownMarker(marker)),
        }
    }

    /// Encode as a frame (client side)
    ///
    /// Input that is not valid UTF-8 is sent as a binary frame.
    pub fn into_frame(self) -> Frame {
        match self {
            ClientMessage::Input(data) => match std::str::from_utf8(&data) {
                Ok(text) => Frame::Text(marked(ClientMessageType::Input.as_u8(), text)),
                Err(_) => Frame::Binary(data),
            },
            ClientMessage::Ping => Frame::Text(marked(ClientMessageType::Ping.as_u8(), "")),
            ClientMessage::Resize(size) => {
                let json = serde_json::json!({ "columns": size.cols, "rows": size.rows });
                Frame::Text(marked(ClientMessageType::Resize.as_u8(), &json.to_string()))
            }
        }
    }
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Raw terminal output
    Output(Bytes),
    /// Keepalive reply
    Pong,
    /// Window title
    SetWindowTitle(String),
    /// Terminal preferences
    SetPreferences(serde_json::Value),
    /// Reconnect delay in seconds
    SetReconnect(u64),
}

impl ServerMessage {
    /// Encode as a frame
    pub fn into_frame(self) -> Frame {
        match self {
            ServerMessage::Output(data) => Frame::Binary(data),
            ServerMessage::Pong => Frame::Text(marked(ServerMessageType::Pong.as_u8(), "")),
            ServerMessage::SetWindowTitle(title) => {
                Frame::Text(marked(ServerMessageType::SetWindowTitle.as_u8(), &title))
            }
            ServerMessage::SetPreferences(prefs) => Frame::Text(marked(
                ServerMessageType::SetPreferences.as_u8(),
                &prefs.to_string(),
            )),
            ServerMessage::SetReconnect(secs) => Frame::Text(marked(
                ServerMessageType::SetReconnect.as_u8(),
                &secs.to_string(),
            )),
        }
    }

    /// Decode a server frame (client side)
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let text = match frame {
            Frame::Binary(data) => return Ok(ServerMessage::Output(data.clone())),
            Frame::Text(text) => text,
        };

        let marker = *text.as_bytes().first().ok_or(ProtocolError::Empty)?;
        let msg_type =
            ServerMessageType::from_u8(marker).ok_or(ProtocolError::UnknownMarker(marker))?;
        // Known markers are ASCII, so the payload starts on a char boundary.
        let payload = &text[1..];
        match msg_type {
            ServerMessageType::Pong => Ok(ServerMessage::Pong),
            ServerMessageType::SetWindowTitle => {
                Ok(ServerMessage::SetWindowTitle(payload.to_string()))
            }
            ServerMessageType::SetPreferences => serde_json::from_str(payload)
                .map(ServerMessage::SetPreferences)
                .map_err(|e| ProtocolError::InvalidPayload {
                    marker,
                    reason: e.to_string(),
                }),
            ServerMessageType::SetReconnect => payload
                .parse()
                .map(ServerMessage::SetReconnect)
                .map_err(|e: std::num::ParseIntError| ProtocolError::InvalidPayload {
                    marker,
                    reason: e.to_string(),
                }),
        }
    }
}

fn marked(marker: u8, payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 1);
    out.push(marker as char);
    out.push_str(payload);
    out
}
