//! Terminal emulator preferences
//!
//! The browser terminal accepts a large, open-ended set of preference keys.
//! The common ones are typed here; anything else in the config is kept in
//! `extra` and passed through to the client untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Preferences sent to the browser terminal at session start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TerminalPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_smoothing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_blink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrollbar_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_on_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_on_keystroke: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_on_select: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctrl_c_copy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctrl_v_paste: Option<bool>,

    /// Unrecognised keys, forwarded as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TerminalPreferences {
    /// Render as the JSON object sent to the client
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }
}
