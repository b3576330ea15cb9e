//! Serializable style profile for cross-process communication.
//!
//! A [`StyleProfile`] captures every style setting in a JSON-friendly shape.
//! Front ends send it to the renderer; [`StyleConfig::try_from`] validates it.
//!
//! # Example
//!
//! ```
//! use textmark_renderer::{StyleConfig, StyleProfile};
//!
//! let profile = StyleProfile {
//!     text: "HI".into(),
//!     font_size: 20,
//!     ..StyleProfile::default()
//! };
//!
//! let json = profile.to_json().unwrap();
//! let restored = StyleProfile::from_json(&json).unwrap();
//! let config = StyleConfig::try_from(&restored).unwrap();
//! assert_eq!(config.font_size(), 20);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::style::{FontReference, StyleConfig, TextColor};

// ============================================================================
// Serializable Font Source
// ============================================================================

/// Serializable representation of a [`FontReference`].
///
/// Serializes to a flat structure with at most one field set:
///
/// ```json
/// { "fontPath": "/usr/share/fonts/DejaVuSans.ttf" }
/// // or
/// { "fontName": "NotoSansJP-Regular.otf" }
/// // or neither, for the built-in font
/// ```
///
/// Uploaded font blobs cannot travel through JSON; they export their upload
/// name as `fontName` so a font store holding the same file can resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SerializableFontSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
}

impl From<&FontReference> for SerializableFontSource {
    fn from(font: &FontReference) -> Self {
        match font {
            FontReference::Default => Self::default(),
            FontReference::Path(path) => Self {
                font_path: Some(path.display().to_string()),
                font_name: None,
            },
            FontReference::Stored(name) | FontReference::Memory { name, .. } => Self {
                font_path: None,
                font_name: Some(name.clone()),
            },
        }
    }
}

impl From<SerializableFontSource> for FontReference {
    fn from(source: SerializableFontSource) -> Self {
        if let Some(path) = source.font_path {
            FontReference::Path(PathBuf::from(path))
        } else if let Some(name) = source.font_name {
            FontReference::Stored(name)
        } else {
            FontReference::Default
        }
    }
}

// ============================================================================
// StyleProfile
// ============================================================================

/// A serializable profile containing all overlay settings.
///
/// # JSON Format
///
/// ```json
/// {
///   "text": "Sample Text",
///   "fontName": "NotoSansJP-Regular.otf",
///   "fontSize": 50,
///   "textColor": "#ffffff",
///   "strokeWidth": 2,
///   "strokeColor": "#000000",
///   "x": 50,
///   "y": 50
/// }
/// ```
///
/// Missing fields take the defaults of [`StyleConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleProfile {
    pub text: String,

    #[serde(flatten)]
    pub font: SerializableFontSource,

    pub font_size: u32,

    /// Hex or named color.
    pub text_color: String,

    pub stroke_width: u32,

    /// Hex or named color.
    pub stroke_color: String,

    pub x: i32,
    pub y: i32,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self::from(&StyleConfig::default())
    }
}

impl StyleProfile {
    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<&StyleConfig> for StyleProfile {
    fn from(config: &StyleConfig) -> Self {
        let (x, y) = config.position();
        Self {
            text: config.text().to_string(),
            font: config.font().into(),
            font_size: config.font_size(),
            text_color: config.text_color().to_hex(),
            stroke_width: config.stroke_width(),
            stroke_color: config.stroke_color().to_hex(),
            x,
            y,
        }
    }
}

impl TryFrom<&StyleProfile> for StyleConfig {
    type Error = ConfigError;

    fn try_from(profile: &StyleProfile) -> Result<Self, Self::Error> {
        let text_color = TextColor::parse("text", &profile.text_color)?;
        let stroke_color = TextColor::parse("stroke", &profile.stroke_color)?;

        StyleConfig::builder(profile.text.clone())
            .font(profile.font.clone().into())
            .font_size(profile.font_size)
            .text_color(text_color)
            .stroke(profile.stroke_width, stroke_color)
            .position(profile.x, profile.y)
            .build()
    }
}

// ============================================================================
// Tests
// ============================================================================
