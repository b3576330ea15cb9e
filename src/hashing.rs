//! Fingerprints of the inputs that produce a batch artifact.
//!
//! A [`Fingerprint`] is a SHA-256 digest over everything that influences the
//! archive bytes: the style, the export options, and every input image (name
//! and content, in order). Two runs with equal fingerprints produce equal
//! archives.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::image_item::InputImage;
use crate::pipeline::ExportOptions;
use crate::profile::StyleProfile;
use crate::style::{FontReference, StyleConfig};

/// Hex-encoded SHA-256 digest identifying one configuration + input set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Computes the fingerprint for a style, options, and input set.
    pub fn compute(style: &StyleConfig, options: &ExportOptions, inputs: &[InputImage]) -> Self {
        let mut hasher = Sha256::new();

        // serde_json keeps struct field order, so this encoding is stable
        let profile = StyleProfile::from(style);
        let profile_json = serde_json::to_string(&profile).unwrap_or_default();
        update_field(&mut hasher, b"style", profile_json.as_bytes());

        if let FontReference::Memory { bytes, .. } = style.font() {
            update_field(&mut hasher, b"font", sha256_hex(bytes).as_bytes());
        }

        update_field(&mut hasher, b"prefix", options.entry_prefix.as_bytes());
        let fallback = options.fallback_format.extensions_str().first().copied().unwrap_or("");
        update_field(&mut hasher, b"fallback", fallback.as_bytes());

        update_field(&mut hasher, b"count", inputs.len().to_string().as_bytes());
        for input in inputs {
            update_field(&mut hasher, b"name", input.name.as_bytes());
            update_field(&mut hasher, b"bytes", sha256_hex(&input.bytes).as_bytes());
        }

        Self(hex_encode(hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length-prefixed field so adjacent values cannot run together.
fn update_field(hasher: &mut Sha256, tag: &[u8], value: &[u8]) {
    hasher.update(tag);
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value);
}

/// Compute SHA-256 of bytes as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(Sha256::digest(data))
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}
