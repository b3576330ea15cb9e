//! Image types flowing through the export pipeline.
//!
//! Raw uploads arrive as [`InputImage`], are decoded into an [`ImageItem`]
//! that remembers its source format, and leave as a [`RenderedItem`] holding
//! standalone encoded bytes.

use std::fmt;
use std::io::Cursor;

use image::buffer::ConvertBuffer;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::error::ItemError;

/// A raw upload: the original file name and its undecoded bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct InputImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputImage {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for InputImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputImage")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A decoded image with the metadata needed to re-encode it faithfully.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    /// The file name the image was uploaded with.
    pub original_name: String,

    /// The decoded raster, in whatever color type the decoder produced.
    pub pixels: DynamicImage,

    /// The detected container format, if known.
    ///
    /// `None` for images constructed in memory; those are exported in the
    /// pipeline's fallback format.
    pub source_format: Option<ImageFormat>,
}

impl ImageItem {
    pub fn new(
        original_name: impl Into<String>,
        pixels: DynamicImage,
        source_format: Option<ImageFormat>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            pixels,
            source_format,
        }
    }

    /// Decodes an upload, detecting its format from the content.
    pub fn decode(input: &InputImage) -> Result<Self, ItemError> {
        let format = image::guess_format(&input.bytes).map_err(ItemError::Decode)?;
        let pixels = image::load_from_memory_with_format(&input.bytes, format)
            .map_err(ItemError::Decode)?;
        Ok(Self::new(input.name.clone(), pixels, Some(format)))
    }

    /// Returns true if the source raster carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.pixels.color().has_alpha()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }
}

/// One finished archive entry.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedItem {
    pub entry_name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for RenderedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedItem")
            .field("entry_name", &self.entry_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Returns false for formats that cannot store an alpha channel.
pub fn format_supports_alpha(format: ImageFormat) -> bool {
    !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Pnm | ImageFormat::Hdr | ImageFormat::OpenExr
    )
}

/// Encodes a composited RGBA raster as `format`.
///
/// The raster is narrowed to RGB8 when the target format has no alpha
/// channel or the source never had one; otherwise it stays RGBA8.
pub fn encode(
    rendered: &RgbaImage,
    format: ImageFormat,
    keep_alpha: bool,
) -> Result<Vec<u8>, ItemError> {
    let output = if keep_alpha && format_supports_alpha(format) {
        DynamicImage::ImageRgba8(rendered.clone())
    } else {
        let rgb: RgbImage = rendered.convert();
        DynamicImage::ImageRgb8(rgb)
    };

    let mut buffer = Cursor::new(Vec::new());
    output
        .write_to(&mut buffer, format)
        .map_err(ItemError::Encode)?;
    Ok(buffer.into_inner())
}

/// Replaces the extension of `name` with the primary extension of `format`.
pub fn with_format_extension(name: &str, format: ImageFormat) -> String {
    let ext = format.extensions_str().first().copied().unwrap_or("bin");
    let file_start = name.rfind(['/', '\\']).map_or(0, |sep| sep + 1);
    let stem = match name.rfind('.') {
        Some(dot) if dot > file_start => &name[..dot],
        _ => name,
    };
    format!("{stem}.{ext}")
}
