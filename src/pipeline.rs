//! Batch export: render every input with one style and pack the results.
//!
//! Items are processed strictly in input order. A failure on one item is
//! recorded and the run moves on; only a run where nothing succeeds is an
//! error. Cancellation is checked between items and yields the partial
//! artifact.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::archive::{ARCHIVE_MIME, ArchiveWriter, EntryNamer};
use crate::error::{ErrorKind, ItemError, PipelineError};
use crate::font::LoadableFont;
use crate::hashing::Fingerprint;
use crate::image_item::{self, ImageItem, InputImage, RenderedItem};
use crate::render;
use crate::style::StyleConfig;

// ============================================================================
// Options and Signals
// ============================================================================

/// Archive-level export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Prepended to every entry name.
    pub entry_prefix: String,

    /// Used when the source format is unknown or cannot be written.
    pub fallback_format: ImageFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            entry_prefix: "edited_".to_string(),
            fallback_format: ImageFormat::Png,
        }
    }
}

/// Emitted after each item, whether it succeeded or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Results
// ============================================================================

/// One entry of the failure manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// The upload name of the failed item.
    pub name: String,
    #[serde(rename = "errorKind")]
    pub kind: ErrorKind,
    pub message: String,
}

/// Terminal status of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchSummary {
    fn record_failure(&mut self, name: &str, err: &ItemError) {
        self.failed += 1;
        self.failures.push(ItemFailure {
            name: name.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    /// Serializes the summary for status channels.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Archive bytes produced by one run, with the record of how they were made.
#[derive(Clone)]
pub struct BatchArtifact {
    pub bytes: Vec<u8>,
    pub item_count: usize,
    pub fingerprint: Fingerprint,
    pub summary: BatchSummary,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    /// True if the run stopped early on a cancel signal.
    pub cancelled: bool,
}

impl std::fmt::Debug for BatchArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchArtifact")
            .field("len", &self.bytes.len())
            .field("item_count", &self.item_count)
            .field("fingerprint", &self.fingerprint)
            .field("summary", &self.summary)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

impl BatchArtifact {
    pub fn mime(&self) -> &'static str {
        ARCHIVE_MIME
    }

    /// True if some inputs are missing from the archive.
    pub fn is_partial(&self) -> bool {
        self.cancelled || self.summary.failed > 0
    }
}

// ============================================================================
// ExportPipeline
// ============================================================================

/// Renders and archives a batch of images under one fixed style.
#[derive(Debug, Clone, Default)]
pub struct ExportPipeline {
    options: ExportOptions,
}

impl ExportPipeline {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Runs the batch.
    ///
    /// `font` is shared read-only by every item. `progress` is called after
    /// each processed item. `cancel` is checked before each item.
    #[tracing::instrument(skip_all, fields(total = inputs.len()))]
    pub fn run(
        &self,
        inputs: &[InputImage],
        style: &StyleConfig,
        font: &LoadableFont,
        progress: &mut dyn FnMut(Progress),
        cancel: &CancelToken,
    ) -> Result<BatchArtifact, PipelineError> {
        if inputs.is_empty() {
            return Err(PipelineError::NoInputs);
        }

        let total = inputs.len();
        let fingerprint = Fingerprint::compute(style, &self.options, inputs);
        let mut writer = ArchiveWriter::new();
        let mut namer = EntryNamer::new(self.options.entry_prefix.clone());
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };
        let mut entries = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, input) in inputs.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(completed = index, total, "batch cancelled");
                cancelled = true;
                break;
            }

            match self.export_item(input, style, font, &mut namer, &mut writer) {
                Ok(entry) => {
                    tracing::debug!(name = %input.name, entry = %entry.entry_name, format = ?entry.format, "item exported");
                    summary.succeeded += 1;
                    entries.push(entry.entry_name);
                }
                Err(err) => {
                    tracing::warn!(name = %input.name, error = %err, "item failed");
                    summary.record_failure(&input.name, &err);
                }
            }

            progress(Progress {
                completed: index + 1,
                total,
            });
        }

        if !cancelled && summary.succeeded == 0 {
            return Err(PipelineError::AllItemsFailed {
                count: total,
                failures: summary.failures,
            });
        }

        let bytes = writer.finish()?;
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled,
            size = bytes.len(),
            "batch finished"
        );

        Ok(BatchArtifact {
            bytes,
            item_count: entries.len(),
            fingerprint,
            summary,
            entries,
            cancelled,
        })
    }

    /// Decodes, renders, encodes, and archives one input.
    fn export_item(
        &self,
        input: &InputImage,
        style: &StyleConfig,
        font: &LoadableFont,
        namer: &mut EntryNamer,
        writer: &mut ArchiveWriter,
    ) -> Result<RenderedItem, ItemError> {
        let item = ImageItem::decode(input)?;
        let mut rendered = self.render_encoded(&item, style, font)?;

        rendered.entry_name = namer.assign(&rendered.entry_name);
        writer
            .add(&rendered.entry_name, &rendered.bytes)
            .map_err(|err| ItemError::Archive(err.to_string()))?;
        Ok(rendered)
    }

    /// Renders one decoded item and encodes it, preferring its source format.
    ///
    /// If the source format fails to encode, retries once with the fallback
    /// format and rewrites the name's extension to match. The returned entry
    /// name is not yet prefixed or deduplicated.
    pub fn render_encoded(
        &self,
        item: &ImageItem,
        style: &StyleConfig,
        font: &LoadableFont,
    ) -> Result<RenderedItem, ItemError> {
        let canvas = render::render_item(item, style, font);
        let keep_alpha = item.has_alpha();
        let fallback = self.options.fallback_format;
        let target = item.source_format.unwrap_or(fallback);

        match image_item::encode(&canvas, target, keep_alpha) {
            Ok(bytes) => Ok(RenderedItem {
                entry_name: item.original_name.clone(),
                format: target,
                bytes,
            }),
            Err(err) if target != fallback => {
                tracing::warn!(
                    name = %item.original_name,
                    error = %err,
                    from = ?target,
                    to = ?fallback,
                    "re-encoding with fallback format"
                );
                let bytes = image_item::encode(&canvas, fallback, keep_alpha)?;
                Ok(RenderedItem {
                    entry_name: image_item::with_format_extension(&item.original_name, fallback),
                    format: fallback,
                    bytes,
                })
            }
            Err(err) => Err(err),
        }
    }
}
