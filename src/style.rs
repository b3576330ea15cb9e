//! Style configuration for a text overlay.
//!
//! A [`StyleConfig`] is an immutable value that governs an entire batch run
//! and every preview render. It can only be obtained through a validating
//! constructor, so a config that exists is a config that can be rendered.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use image::Rgba;
use palette::Srgb;

use crate::error::{ConfigError, ConfigResult};

// ============================================================================
// TextColor
// ============================================================================

/// A straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TextColor {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parses a hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`) or named color.
    ///
    /// `field` names the style field in the returned error.
    pub fn parse(field: &'static str, value: &str) -> ConfigResult<Self> {
        parse_color(value.trim()).ok_or_else(|| ConfigError::invalid_color(field, value))
    }

    /// Returns the color as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }

    fn from_srgb(rgb: Srgb<u8>, a: u8) -> Self {
        let (r, g, b) = rgb.into_components();
        Self::new(r, g, b, a)
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn parse_color(value: &str) -> Option<TextColor> {
    if value.eq_ignore_ascii_case("transparent") {
        return Some(TextColor::TRANSPARENT);
    }

    let digits = value.strip_prefix('#').unwrap_or(value);
    let is_hex = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit());

    if is_hex {
        return match digits.len() {
            3 | 6 => Srgb::<u8>::from_str(digits)
                .ok()
                .map(|rgb| TextColor::from_srgb(rgb, 255)),
            4 => {
                let rgb = Srgb::<u8>::from_str(&digits[..3]).ok()?;
                let nibble = u8::from_str_radix(&digits[3..], 16).ok()?;
                Some(TextColor::from_srgb(rgb, nibble * 17))
            }
            8 => {
                let rgb = Srgb::<u8>::from_str(&digits[..6]).ok()?;
                let alpha = u8::from_str_radix(&digits[6..], 16).ok()?;
                Some(TextColor::from_srgb(rgb, alpha))
            }
            _ => None,
        };
    }

    palette::named::from_str(&value.to_ascii_lowercase()).map(|rgb| TextColor::from_srgb(rgb, 255))
}

// ============================================================================
// FontReference
// ============================================================================

/// Which glyph source a style asks for.
///
/// Read-only for the duration of a render; cloning is cheap.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum FontReference {
    /// The built-in fallback font.
    #[default]
    Default,

    /// A font file on disk.
    Path(PathBuf),

    /// A font known to the [`FontStore`](crate::FontStore) by name.
    Stored(String),

    /// An uploaded font blob.
    Memory { name: String, bytes: Arc<[u8]> },
}

impl FontReference {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Human-readable label used in logs and warnings.
    pub fn label(&self) -> String {
        match self {
            Self::Default => "default".to_string(),
            Self::Path(path) => path.display().to_string(),
            Self::Stored(name) => name.clone(),
            Self::Memory { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for FontReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stored(name) => f.debug_tuple("Stored").field(name).finish(),
            Self::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

// ============================================================================
// StyleConfig
// ============================================================================

/// Immutable overlay style: what text to draw, with which font, and where.
///
/// Build one with [`StyleConfig::builder`], or derive a modified copy with
/// the `with_*` methods. Both paths validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleConfig {
    text: String,
    font: FontReference,
    font_size: u32,
    text_color: TextColor,
    stroke_width: u32,
    stroke_color: TextColor,
    x: i32,
    y: i32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            text: "Sample Text".to_string(),
            font: FontReference::Default,
            font_size: 50,
            text_color: TextColor::WHITE,
            stroke_width: 2,
            stroke_color: TextColor::BLACK,
            x: 50,
            y: 50,
        }
    }
}

impl StyleConfig {
    /// Starts a builder seeded with the default style and the given text.
    pub fn builder(text: impl Into<String>) -> StyleConfigBuilder {
        StyleConfigBuilder {
            config: Self {
                text: text.into(),
                ..Self::default()
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> &FontReference {
        &self.font
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn text_color(&self) -> TextColor {
        self.text_color
    }

    pub fn stroke_width(&self) -> u32 {
        self.stroke_width
    }

    pub fn stroke_color(&self) -> TextColor {
        self.stroke_color
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Returns true when there is nothing visible to draw.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    pub fn with_font(&self, font: FontReference) -> Self {
        Self {
            font,
            ..self.clone()
        }
    }

    pub fn with_font_size(&self, font_size: u32) -> ConfigResult<Self> {
        validate_font_size(font_size)?;
        Ok(Self {
            font_size,
            ..self.clone()
        })
    }

    pub fn with_text_color(&self, text_color: TextColor) -> Self {
        Self {
            text_color,
            ..self.clone()
        }
    }

    pub fn with_stroke(&self, stroke_width: u32, stroke_color: TextColor) -> ConfigResult<Self> {
        validate_stroke_width(stroke_width)?;
        Ok(Self {
            stroke_width,
            stroke_color,
            ..self.clone()
        })
    }

    pub fn with_position(&self, x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..self.clone()
        }
    }
}

/// Largest accepted font size, in pixels.
pub const MAX_FONT_SIZE: u32 = 1000;

/// Largest accepted stroke width, in pixels.
pub const MAX_STROKE_WIDTH: u32 = 50;

fn validate_font_size(font_size: u32) -> ConfigResult<()> {
    if font_size == 0 {
        return Err(ConfigError::NonPositiveFontSize);
    }
    if font_size > MAX_FONT_SIZE {
        return Err(ConfigError::OutOfRange {
            field: "font size",
            value: font_size,
            min: 1,
            max: MAX_FONT_SIZE,
        });
    }
    Ok(())
}

fn validate_stroke_width(stroke_width: u32) -> ConfigResult<()> {
    if stroke_width > MAX_STROKE_WIDTH {
        return Err(ConfigError::OutOfRange {
            field: "stroke width",
            value: stroke_width,
            min: 0,
            max: MAX_STROKE_WIDTH,
        });
    }
    Ok(())
}

/// Builder for [`StyleConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct StyleConfigBuilder {
    config: StyleConfig,
}

impl StyleConfigBuilder {
    pub fn font(mut self, font: FontReference) -> Self {
        self.config.font = font;
        self
    }

    pub fn font_size(mut self, font_size: u32) -> Self {
        self.config.font_size = font_size;
        self
    }

    pub fn text_color(mut self, color: TextColor) -> Self {
        self.config.text_color = color;
        self
    }

    pub fn stroke(mut self, width: u32, color: TextColor) -> Self {
        self.config.stroke_width = width;
        self.config.stroke_color = color;
        self
    }

    pub fn position(mut self, x: i32, y: i32) -> Self {
        self.config.x = x;
        self.config.y = y;
        self
    }

    pub fn build(self) -> ConfigResult<StyleConfig> {
        validate_font_size(self.config.font_size)?;
        validate_stroke_width(self.config.stroke_width)?;
        Ok(self.config)
    }
}
