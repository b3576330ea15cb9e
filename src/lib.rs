//! textmark-renderer: batch text overlay for raster images
//!
//! This crate draws one styled line of text onto every image in a batch and
//! packs the results into a single ZIP archive. A live preview of the first
//! image goes through the same renderer, so it always shows what the archive
//! will contain.
//!
//! # Example
//!
//! ```
//! use textmark_renderer::{BatchSession, CancelToken, InputImage, StyleConfig, TextColor};
//! # use image::{ImageFormat, Rgba, RgbaImage};
//! # let img = RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255]));
//! # let mut png = std::io::Cursor::new(Vec::new());
//! # img.write_to(&mut png, ImageFormat::Png).unwrap();
//! # let png = png.into_inner();
//!
//! let mut session = BatchSession::default();
//! session.set_inputs(vec![InputImage::new("a.png", png)]);
//! session.set_style(
//!     StyleConfig::builder("Hello")
//!         .font_size(20)
//!         .text_color(TextColor::WHITE)
//!         .stroke(1, TextColor::BLACK)
//!         .position(10, 10)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let preview = session.preview().unwrap().unwrap();
//! assert_eq!(preview.image.dimensions(), (100, 100));
//!
//! session.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();
//! let archive = session.download().unwrap();
//! assert_eq!(archive.entries, vec!["edited_a.png"]);
//! ```
//!
//! # Serializable Profiles
//!
//! Front ends exchange settings as [`StyleProfile`] JSON through the
//! [`Configurable`] trait:
//!
//! ```
//! use textmark_renderer::{BatchSession, Configurable, StyleProfile};
//!
//! let mut session = BatchSession::default();
//! let profile = StyleProfile::from_json(r##"{"text":"Hi","fontSize":32,"textColor":"#ff0"}"##).unwrap();
//! session.apply_profile(&profile).unwrap();
//!
//! let exported = session.export_profile();
//! assert_eq!(exported.text_color, "#ffff00");
//! ```

mod archive;
mod error;
mod font;
mod hashing;
mod image_item;
mod pipeline;
mod profile;
mod render;
mod session;
mod style;

pub use archive::{ARCHIVE_MIME, ArchiveWriter, DEFAULT_ARCHIVE_NAME, EntryNamer, read_entries};
pub use error::{
    ConfigError, ConfigResult, ErrorKind, FontLoadError, ItemError, PipelineError, SessionError,
    SessionResult,
};
pub use font::{
    BitmapFont, FontResolver, FontStore, FontWarning, FsFontStore, LoadableFont, ResolvedFont,
};
pub use hashing::{Fingerprint, sha256_hex};
pub use image_item::{
    ImageItem, InputImage, RenderedItem, encode, format_supports_alpha, with_format_extension,
};
pub use pipeline::{
    BatchArtifact, BatchSummary, CancelToken, ExportOptions, ExportPipeline, ItemFailure, Progress,
};
pub use profile::{SerializableFontSource, StyleProfile};
pub use render::{CoverageMask, RectPx, draw_text_mut, render_item, render_overlay, text_bounds};
pub use session::{BatchReport, BatchSession, CacheState, Configurable, Preview};
pub use style::{
    FontReference, MAX_FONT_SIZE, MAX_STROKE_WIDTH, StyleConfig, StyleConfigBuilder, TextColor,
};
