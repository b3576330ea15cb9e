//! Font resolution with a guaranteed fallback.
//!
//! [`FontResolver`] maps a [`FontReference`] to a [`LoadableFont`] at a
//! specific size. Resolution never fails: when the requested font cannot be
//! loaded, the resolver walks its fallback chain and ends at the built-in
//! [`BitmapFont`], reporting what happened as a [`FontWarning`] value.
//!
//! # Fallback chain
//!
//! ```text
//! FontReference::Default ───────────────────────────────┐
//!                                                       │
//! requested font ──fail──► configured fallbacks ──fail──┴──► BitmapFont
//!      │                          │
//!      ▼                          ▼
//!   Outline                 Outline (+ warning)
//! ```

pub mod bitmap;

pub use bitmap::BitmapFont;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusttype::{Font, Scale, point};

use crate::error::FontLoadError;
use crate::style::FontReference;

// ============================================================================
// Font Store
// ============================================================================

/// Source of font bytes.
///
/// This is the seam to whatever manages font files (an upload directory, an
/// asset bundle, a database). The resolver only needs these two operations.
pub trait FontStore {
    /// Lists the fonts this store can load.
    fn list_available(&self) -> Vec<FontReference>;

    /// Loads the raw bytes behind a reference.
    fn load_bytes(&self, font: &FontReference) -> Result<Vec<u8>, FontLoadError>;
}

/// Filesystem-backed [`FontStore`].
///
/// `Path` references are read directly. `Stored` names are looked up inside
/// the optional root directory. `Memory` references return their own bytes.
#[derive(Debug, Clone, Default)]
pub struct FsFontStore {
    root: Option<PathBuf>,
}

impl FsFontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that resolves `Stored` names inside `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
}

fn read_font_file(path: &Path) -> Result<Vec<u8>, FontLoadError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            FontLoadError::NotFound(path.display().to_string())
        } else {
            FontLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

impl FontStore for FsFontStore {
    fn list_available(&self) -> Vec<FontReference> {
        let Some(root) = &self.root else {
            return Vec::new();
        };

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "cannot list font directory");
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_font_file(path))
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        names.into_iter().map(FontReference::Stored).collect()
    }

    fn load_bytes(&self, font: &FontReference) -> Result<Vec<u8>, FontLoadError> {
        match font {
            FontReference::Default => Err(FontLoadError::NotFound("default".to_string())),
            FontReference::Path(path) => read_font_file(path),
            FontReference::Stored(name) => {
                let escapes_root =
                    name.contains(['/', '\\']) || name == ".." || name.is_empty();
                match &self.root {
                    Some(root) if !escapes_root => read_font_file(&root.join(name)),
                    _ => Err(FontLoadError::NotFound(name.clone())),
                }
            }
            FontReference::Memory { bytes, .. } => Ok(bytes.to_vec()),
        }
    }
}

// ============================================================================
// LoadableFont
// ============================================================================

/// A glyph source with its size baked in.
#[derive(Clone)]
pub enum LoadableFont {
    /// A scalable TrueType/OpenType font at `size` pixels per em.
    Outline { font: Font<'static>, size: f32 },

    /// The built-in bitmap font.
    Bitmap(BitmapFont),
}

impl fmt::Debug for LoadableFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outline { size, .. } => f.debug_struct("Outline").field("size", size).finish(),
            Self::Bitmap(bitmap) => f.debug_tuple("Bitmap").field(bitmap).finish(),
        }
    }
}

impl LoadableFont {
    /// Parses outline font bytes at the given pixel size.
    pub fn outline_from_bytes(bytes: Vec<u8>, size: u32) -> Option<Self> {
        let font = Font::try_from_vec(bytes)?;
        Some(Self::Outline {
            font,
            size: size as f32,
        })
    }

    pub fn bitmap(size: u32) -> Self {
        Self::Bitmap(BitmapFont::for_size(size))
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self, Self::Bitmap(_))
    }

    /// Calls `plot(x, y, coverage)` for every covered pixel of `text`.
    ///
    /// `(x, y)` is the top-left of the first line box. Outline glyphs sit on
    /// a baseline at `y + ascent`; bitmap glyph cells start at `y`. Lines are
    /// separated by explicit `'\n'` only.
    pub fn rasterize(&self, text: &str, x: i32, y: i32, plot: &mut dyn FnMut(i32, i32, f32)) {
        match self {
            Self::Outline { font, size } => {
                let scale = Scale::uniform(*size);
                let v_metrics = font.v_metrics(scale);
                let line_height = v_metrics.ascent - v_metrics.descent + v_metrics.line_gap;

                for (line_idx, line) in text.split('\n').enumerate() {
                    let baseline = y as f32 + v_metrics.ascent + line_idx as f32 * line_height;
                    for glyph in font.layout(line, scale, point(x as f32, baseline)) {
                        let Some(bb) = glyph.pixel_bounding_box() else {
                            continue;
                        };
                        glyph.draw(|gx, gy, coverage| {
                            if let (Some(px), Some(py)) = (
                                bb.min.x.checked_add(gx as i32),
                                bb.min.y.checked_add(gy as i32),
                            ) {
                                plot(px, py, coverage);
                            }
                        });
                    }
                }
            }
            Self::Bitmap(bitmap) => bitmap.rasterize(text, x, y, plot),
        }
    }

    /// Returns the pixel size of the line boxes `text` occupies.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            Self::Outline { font, size } => {
                let scale = Scale::uniform(*size);
                let v_metrics = font.v_metrics(scale);
                let line_height = v_metrics.ascent - v_metrics.descent + v_metrics.line_gap;

                let mut width: f32 = 0.0;
                let mut ink_bottom: f32 = 0.0;
                let mut lines = 0;
                for (line_idx, line) in text.split('\n').enumerate() {
                    lines += 1;
                    let baseline = v_metrics.ascent + line_idx as f32 * line_height;
                    for glyph in font.layout(line, scale, point(0.0, baseline)) {
                        let advance_end =
                            glyph.position().x + glyph.unpositioned().h_metrics().advance_width;
                        width = width.max(advance_end);
                        // Pixel boxes round outward and may overhang the advance.
                        if let Some(bb) = glyph.pixel_bounding_box() {
                            width = width.max(bb.max.x as f32);
                            ink_bottom = ink_bottom.max(bb.max.y as f32);
                        }
                    }
                }
                let height = (v_metrics.ascent - v_metrics.descent
                    + (lines - 1) as f32 * line_height)
                    .max(ink_bottom);
                (width.ceil() as u32, height.ceil() as u32)
            }
            Self::Bitmap(bitmap) => bitmap.measure(text),
        }
    }
}

// ============================================================================
// FontWarning
// ============================================================================

/// Non-fatal report that a render did not get the font it asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontWarning {
    /// The style asked for the default font, which is the bitmap fallback.
    DefaultRequested,

    /// The requested font failed to load; `substitute` was used instead.
    LoadFailed {
        requested: String,
        reason: String,
        substitute: String,
    },
}

impl fmt::Display for FontWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultRequested => {
                f.write_str("no font selected; using the built-in bitmap font")
            }
            Self::LoadFailed {
                requested,
                reason,
                substitute,
            } => write!(
                f,
                "font {requested:?} could not be loaded ({reason}); using {substitute}"
            ),
        }
    }
}

/// Outcome of [`FontResolver::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedFont {
    pub font: LoadableFont,
    pub warning: Option<FontWarning>,
}

// ============================================================================
// FontResolver
// ============================================================================

const BITMAP_LABEL: &str = "built-in bitmap font";

/// Resolves font references against a [`FontStore`].
///
/// Query once per render with the current size; the size is part of the
/// returned font and nothing is cached between calls.
#[derive(Debug, Clone, Default)]
pub struct FontResolver<S = FsFontStore> {
    store: S,
    fallbacks: Vec<FontReference>,
}

impl<S: FontStore> FontResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            fallbacks: Vec::new(),
        }
    }

    /// Adds outline fonts to try, in order, before the bitmap font.
    pub fn with_fallbacks(mut self, fallbacks: impl IntoIterator<Item = FontReference>) -> Self {
        self.fallbacks.extend(fallbacks);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fonts the underlying store offers.
    pub fn list_available(&self) -> Vec<FontReference> {
        self.store.list_available()
    }

    /// Attempts to load `font` as an outline font at `size`.
    pub fn load(&self, font: &FontReference, size: u32) -> Result<LoadableFont, FontLoadError> {
        let bytes = self.store.load_bytes(font)?;
        LoadableFont::outline_from_bytes(bytes, size)
            .ok_or_else(|| FontLoadError::Unsupported(font.label()))
    }

    /// Resolves `font` at `size`, falling back as needed. Never fails.
    pub fn resolve(&self, font: &FontReference, size: u32) -> ResolvedFont {
        if font.is_default() {
            tracing::debug!(size, "default font requested; using bitmap font");
            return ResolvedFont {
                font: LoadableFont::bitmap(size),
                warning: Some(FontWarning::DefaultRequested),
            };
        }

        let err = match self.load(font, size) {
            Ok(loaded) => {
                return ResolvedFont {
                    font: loaded,
                    warning: None,
                };
            }
            Err(err) => err,
        };

        let (loaded, substitute) = self
            .fallbacks
            .iter()
            .find_map(|fallback| {
                self.load(fallback, size)
                    .ok()
                    .map(|loaded| (loaded, fallback.label()))
            })
            .unwrap_or_else(|| (LoadableFont::bitmap(size), BITMAP_LABEL.to_string()));

        let warning = FontWarning::LoadFailed {
            requested: font.label(),
            reason: err.to_string(),
            substitute,
        };
        tracing::warn!(%warning, "font fallback");

        ResolvedFont {
            font: loaded,
            warning: Some(warning),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_dir(tag: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "textmark-font-{tag}-{}-{n}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_reference_resolves_to_bitmap_with_warning() {
        let resolver = FontResolver::new(FsFontStore::new());
        let resolved = resolver.resolve(&FontReference::Default, 24);
        assert!(resolved.font.is_bitmap());
        assert_eq!(resolved.warning, Some(FontWarning::DefaultRequested));
    }

    #[test]
    fn corrupt_bytes_fall_back_without_error() {
        let resolver = FontResolver::new(FsFontStore::new());
        let corrupt = FontReference::from_bytes("broken.ttf", b"definitely not a font".to_vec());
        let resolved = resolver.resolve(&corrupt, 32);

        assert!(resolved.font.is_bitmap());
        match resolved.warning {
            Some(FontWarning::LoadFailed {
                requested,
                substitute,
                ..
            }) => {
                assert_eq!(requested, "broken.ttf");
                assert_eq!(substitute, BITMAP_LABEL);
            }
            other => panic!("expected LoadFailed, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_falls_back() {
        let resolver = FontResolver::new(FsFontStore::new());
        let missing = FontReference::Path(PathBuf::from("/nonexistent/arial.ttf"));
        let resolved = resolver.resolve(&missing, 16);
        assert!(resolved.font.is_bitmap());
        let warning = resolved.warning.unwrap().to_string();
        assert!(warning.contains("arial.ttf"), "{warning}");
    }

    #[test]
    fn bitmap_size_is_baked_per_call() {
        let resolver = FontResolver::new(FsFontStore::new());
        let small = resolver.resolve(&FontReference::Default, 8).font;
        let large = resolver.resolve(&FontReference::Default, 64).font;
        assert_ne!(small.measure("A"), large.measure("A"));
    }

    #[test]
    fn failing_fallbacks_end_at_bitmap() {
        let resolver = FontResolver::new(FsFontStore::new())
            .with_fallbacks([FontReference::Path(PathBuf::from("/nonexistent/DejaVuSans.ttf"))]);
        let resolved = resolver.resolve(&FontReference::Stored("nope.ttf".into()), 20);
        assert!(resolved.font.is_bitmap());
        assert!(resolved.warning.is_some());
    }

    #[test]
    fn directory_store_lists_font_files_sorted() {
        let dir = temp_dir("list");
        fs::write(dir.join("b.otf"), b"x").unwrap();
        fs::write(dir.join("a.TTF"), b"x").unwrap();
        fs::write(dir.join("notes.txt"), b"x").unwrap();

        let store = FsFontStore::with_root(&dir);
        assert_eq!(
            store.list_available(),
            vec![
                FontReference::Stored("a.TTF".into()),
                FontReference::Stored("b.otf".into()),
            ]
        );
        assert_eq!(
            store.load_bytes(&FontReference::Stored("b.otf".into())).unwrap(),
            b"x".to_vec()
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn stored_names_cannot_escape_root() {
        let store = FsFontStore::with_root(std::env::temp_dir());
        let err = store
            .load_bytes(&FontReference::Stored("../etc/passwd".into()))
            .unwrap_err();
        assert!(matches!(err, FontLoadError::NotFound(_)));
    }

    #[test]
    fn store_without_root_lists_nothing() {
        assert!(FsFontStore::new().list_available().is_empty());
    }
}
