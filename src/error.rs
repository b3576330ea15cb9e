//! Error types for configuration, font loading, per-item processing, and
//! batch runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result alias for fallible style construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid style values, rejected before any render is attempted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration error: font size must be positive")]
    NonPositiveFontSize,

    #[error("configuration error: invalid {field} color {value:?}")]
    InvalidColor { field: &'static str, value: String },

    #[error("configuration error: {field} {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

impl ConfigError {
    pub fn invalid_color(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidColor {
            field,
            value: value.into(),
        }
    }
}

/// A requested font could not be turned into a glyph source.
///
/// Always recovered inside [`FontResolver`](crate::FontResolver); it only
/// surfaces as the payload of a [`FontWarning`](crate::FontWarning).
#[derive(thiserror::Error, Debug)]
pub enum FontLoadError {
    #[error("font not found: {0}")]
    NotFound(String),

    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported font data: {0}")]
    Unsupported(String),
}

/// Why a single batch item failed.
#[derive(thiserror::Error, Debug)]
pub enum ItemError {
    #[error("decode failed: {0}")]
    Decode(#[source] image::ImageError),

    #[error("encode failed: {0}")]
    Encode(#[source] image::ImageError),

    #[error("archive write failed: {0}")]
    Archive(String),
}

impl ItemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Archive(_) => ErrorKind::Archive,
        }
    }
}

/// Serializable classification of an [`ItemError`] for failure manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Decode,
    Encode,
    Archive,
}

/// Errors that abort a whole batch run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("pipeline error: no input images")]
    NoInputs,

    #[error("pipeline error: all {count} items failed")]
    AllItemsFailed {
        count: usize,
        failures: Vec<crate::pipeline::ItemFailure>,
    },

    #[error("pipeline error: archive could not be finalized: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Errors surfaced by [`BatchSession`](crate::BatchSession).
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("batch artifact is stale or missing; run the batch again")]
    StaleArtifact,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("preview failed: {0}")]
    Preview(#[from] ItemError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type SessionResult<T> = Result<T, SessionError>;
