//! Session controller keeping preview, batch artifact, and settings in step.

use image::RgbaImage;

use crate::error::{ConfigResult, SessionError, SessionResult};
use crate::font::{FontResolver, FontStore, FontWarning, FsFontStore, ResolvedFont};
use crate::hashing::Fingerprint;
use crate::image_item::{ImageItem, InputImage};
use crate::pipeline::{BatchArtifact, BatchSummary, CancelToken, ExportOptions, ExportPipeline, Progress};
use crate::profile::StyleProfile;
use crate::render;
use crate::style::{FontReference, StyleConfig, TextColor};

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types that can be configured from a [`StyleProfile`].
pub trait Configurable {
    /// Applies a profile's settings to this instance.
    fn apply_profile(&mut self, profile: &StyleProfile) -> ConfigResult<()>;

    /// Exports the current settings as a profile.
    fn export_profile(&self) -> StyleProfile;
}

// ============================================================================
// Session State
// ============================================================================

/// Whether the stored artifact reflects the current settings and inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Valid,
    Invalid,
}

/// A rendered preview of the first input.
#[derive(Debug, Clone)]
pub struct Preview {
    pub image: RgbaImage,
    pub warning: Option<FontWarning>,
}

/// Outcome of [`BatchSession::run_batch`].
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub font_warning: Option<FontWarning>,

    /// The partial archive of a cancelled run. Cancelled runs are never
    /// stored in the session, so this is the only way to reach them.
    pub cancelled: Option<BatchArtifact>,
}

impl BatchReport {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }
}

// ============================================================================
// BatchSession
// ============================================================================

/// Holds one user's style, inputs, and the last batch artifact.
///
/// Every mutator goes through a single invalidation hook: when the new
/// value differs from the current one, the version counter is bumped and
/// the stored artifact is dropped, so [`download`](Self::download) can never
/// hand out an archive that no longer matches what the preview shows.
///
/// # Example
///
/// ```
/// use textmark_renderer::{BatchSession, CacheState};
///
/// let mut session = BatchSession::default();
/// assert_eq!(session.state(), CacheState::Invalid);
/// assert!(session.download().is_err());
/// ```
pub struct BatchSession<S: FontStore = FsFontStore> {
    style: StyleConfig,
    inputs: Vec<InputImage>,
    resolver: FontResolver<S>,
    pipeline: ExportPipeline,
    version: u64,
    artifact: Option<BatchArtifact>,
}

impl Default for BatchSession<FsFontStore> {
    fn default() -> Self {
        Self::new(FontResolver::default())
    }
}

impl<S: FontStore> BatchSession<S> {
    /// Creates a session with default style and options and no inputs.
    pub fn new(resolver: FontResolver<S>) -> Self {
        Self {
            style: StyleConfig::default(),
            inputs: Vec::new(),
            resolver,
            pipeline: ExportPipeline::default(),
            version: 0,
            artifact: None,
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.pipeline = ExportPipeline::new(options);
        self
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn inputs(&self) -> &[InputImage] {
        &self.inputs
    }

    pub fn options(&self) -> &ExportOptions {
        self.pipeline.options()
    }

    pub fn resolver(&self) -> &FontResolver<S> {
        &self.resolver
    }

    /// Fonts the session's store offers.
    pub fn list_fonts(&self) -> Vec<FontReference> {
        self.resolver.list_available()
    }

    /// Returns the mutation counter. It increments on every real change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> CacheState {
        if self.artifact.is_some() {
            CacheState::Valid
        } else {
            CacheState::Invalid
        }
    }

    /// Fingerprint of the current settings and inputs.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.style, self.pipeline.options(), &self.inputs)
    }

    /// Resolves the current font at the current size.
    pub fn resolve_font(&self) -> ResolvedFont {
        self.resolver.resolve(self.style.font(), self.style.font_size())
    }

    // ------------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------------

    /// Invalidation hook. Returns `changed` for convenience.
    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.version = self.version.wrapping_add(1);
            if self.artifact.take().is_some() {
                tracing::info!(version = self.version, "batch artifact invalidated");
            }
        }
        changed
    }

    /// Replaces the whole style. Returns true if it changed.
    pub fn set_style(&mut self, style: StyleConfig) -> bool {
        let changed = self.style != style;
        if changed {
            self.style = style;
        }
        self.touch(changed)
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let style = self.style.with_text(text);
        self.set_style(style)
    }

    pub fn set_font(&mut self, font: FontReference) -> bool {
        let style = self.style.with_font(font);
        self.set_style(style)
    }

    /// Rejects a size outside `1..=MAX_FONT_SIZE` without touching the session.
    pub fn set_font_size(&mut self, font_size: u32) -> ConfigResult<bool> {
        let style = self.style.with_font_size(font_size)?;
        Ok(self.set_style(style))
    }

    pub fn set_text_color(&mut self, color: TextColor) -> bool {
        let style = self.style.with_text_color(color);
        self.set_style(style)
    }

    /// Rejects an oversized width without touching the session.
    pub fn set_stroke(&mut self, width: u32, color: TextColor) -> ConfigResult<bool> {
        let style = self.style.with_stroke(width, color)?;
        Ok(self.set_style(style))
    }

    pub fn set_position(&mut self, x: i32, y: i32) -> bool {
        let style = self.style.with_position(x, y);
        self.set_style(style)
    }

    pub fn set_inputs(&mut self, inputs: Vec<InputImage>) -> bool {
        let changed = self.inputs != inputs;
        if changed {
            self.inputs = inputs;
        }
        self.touch(changed)
    }

    pub fn add_input(&mut self, input: InputImage) {
        self.inputs.push(input);
        self.touch(true);
    }

    /// Removes the input at `index`, if there is one.
    pub fn remove_input(&mut self, index: usize) -> Option<InputImage> {
        if index >= self.inputs.len() {
            return None;
        }
        let removed = self.inputs.remove(index);
        self.touch(true);
        Some(removed)
    }

    pub fn clear_inputs(&mut self) -> bool {
        let changed = !self.inputs.is_empty();
        self.inputs.clear();
        self.touch(changed)
    }

    pub fn set_options(&mut self, options: ExportOptions) -> bool {
        let changed = *self.pipeline.options() != options;
        if changed {
            self.pipeline = ExportPipeline::new(options);
        }
        self.touch(changed)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Renders the first input with the current settings.
    ///
    /// Never gated on the cache state. Returns `Ok(None)` with no inputs.
    pub fn preview(&self) -> SessionResult<Option<Preview>> {
        let Some(first) = self.inputs.first() else {
            return Ok(None);
        };

        let item = ImageItem::decode(first)?;
        let resolved = self.resolve_font();
        let image = render::render_item(&item, &self.style, &resolved.font);

        Ok(Some(Preview {
            image,
            warning: resolved.warning,
        }))
    }

    /// Runs the batch over all inputs.
    ///
    /// The font is resolved once and shared by every item. A completed run
    /// (even with some failed items) makes the session Valid. A cancelled
    /// run leaves it Invalid and returns the partial archive in the report.
    pub fn run_batch(
        &mut self,
        progress: &mut dyn FnMut(Progress),
        cancel: &CancelToken,
    ) -> SessionResult<BatchReport> {
        if self.artifact.take().is_some() {
            tracing::debug!("discarding previous artifact before rerun");
        }

        let resolved = self.resolve_font();
        let artifact = self
            .pipeline
            .run(&self.inputs, &self.style, &resolved.font, progress, cancel)?;
        let summary = artifact.summary.clone();

        if artifact.cancelled {
            tracing::info!(version = self.version, "batch cancelled; session stays invalid");
            return Ok(BatchReport {
                summary,
                font_warning: resolved.warning,
                cancelled: Some(artifact),
            });
        }

        tracing::info!(
            version = self.version,
            fingerprint = %artifact.fingerprint,
            "batch artifact ready"
        );
        self.artifact = Some(artifact);

        Ok(BatchReport {
            summary,
            font_warning: resolved.warning,
            cancelled: None,
        })
    }

    /// Returns the stored artifact if it still matches the current settings.
    pub fn download(&self) -> SessionResult<&BatchArtifact> {
        match &self.artifact {
            Some(artifact) if artifact.fingerprint == self.fingerprint() => Ok(artifact),
            _ => Err(SessionError::StaleArtifact),
        }
    }
}

impl<S: FontStore> Configurable for BatchSession<S> {
    /// Validates the profile, then replaces the style in one step.
    ///
    /// An uploaded font exports only its name, so applying a profile that
    /// names the current uploaded font keeps the uploaded bytes.
    fn apply_profile(&mut self, profile: &StyleProfile) -> ConfigResult<()> {
        let mut style = StyleConfig::try_from(profile)?;

        if let (FontReference::Memory { name, .. }, FontReference::Stored(requested)) =
            (self.style.font(), style.font())
        {
            if name == requested {
                style = style.with_font(self.style.font().clone());
            }
        }

        self.set_style(style);
        Ok(())
    }

    fn export_profile(&self) -> StyleProfile {
        StyleProfile::from(&self.style)
    }
}
