//! Deterministic ZIP output.
//!
//! Entries carry a fixed timestamp (1980-01-01 00:00:00, the ZIP epoch) and
//! fixed permissions, and are stored uncompressed since every payload is an
//! already-compressed image file. The same entries in the same order always
//! give the same bytes.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// MIME type of the produced archive.
pub const ARCHIVE_MIME: &str = "application/zip";

/// Suggested download file name for the archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "processed_images.zip";

// ============================================================================
// Entry Naming
// ============================================================================

/// Assigns unique archive entry names.
///
/// Names are `<prefix><file name>`, with any directory part of the upload
/// name dropped. When a name repeats, later occurrences get a `-N` suffix
/// before the extension (`edited_a.png`, `edited_a-2.png`, ...). The first
/// occurrence keeps the plain name.
#[derive(Debug, Clone)]
pub struct EntryNamer {
    prefix: String,
    used: HashSet<String>,
}

impl EntryNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            used: HashSet::new(),
        }
    }

    /// Returns the next unique entry name for `original`.
    pub fn assign(&mut self, original: &str) -> String {
        let file_name = original
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("image");
        let base = format!("{}{}", self.prefix, file_name);

        let mut candidate = base.clone();
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = suffixed(&base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

fn suffixed(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{name}-{n}"),
    }
}

// ============================================================================
// ArchiveWriter
// ============================================================================

/// Writes entries into an in-memory ZIP buffer.
///
/// Each writer owns a fresh buffer; one writer serves exactly one batch run.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    pub fn new() -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options,
            entries: 0,
        }
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Appends one entry.
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> ZipResult<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    /// Writes the central directory and returns the archive bytes.
    pub fn finish(self) -> ZipResult<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Reads every entry of an archive as `(name, bytes)`, in archive order.
pub fn read_entries(bytes: &[u8]) -> ZipResult<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        entries.push((file.name().to_string(), content));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namer_prefixes_and_strips_directories() {
        let mut namer = EntryNamer::new("edited_");
        assert_eq!(namer.assign("a.png"), "edited_a.png");
        assert_eq!(namer.assign("uploads/b.jpg"), "edited_b.jpg");
        assert_eq!(namer.assign("..\\evil\\c.gif"), "edited_c.gif");
        assert_eq!(namer.assign("dir/"), "edited_image");
    }

    #[test]
    fn namer_disambiguates_duplicates() {
        let mut namer = EntryNamer::new("edited_");
        assert_eq!(namer.assign("a.png"), "edited_a.png");
        assert_eq!(namer.assign("a.png"), "edited_a-2.png");
        assert_eq!(namer.assign("a.png"), "edited_a-3.png");
        assert_eq!(namer.assign("README"), "edited_README");
        assert_eq!(namer.assign("README"), "edited_README-2");
    }

    #[test]
    fn namer_avoids_collision_with_existing_suffix() {
        let mut namer = EntryNamer::new("");
        assert_eq!(namer.assign("a-2.png"), "a-2.png");
        assert_eq!(namer.assign("a.png"), "a.png");
        assert_eq!(namer.assign("a.png"), "a-3.png");
    }

    #[test]
    fn archive_is_deterministic_and_readable() {
        let build = || {
            let mut writer = ArchiveWriter::new();
            writer.add("edited_a.png", b"first").unwrap();
            writer.add("edited_b.png", b"second").unwrap();
            assert_eq!(writer.len(), 2);
            writer.finish().unwrap()
        };

        let first = build();
        let second = build();
        assert_eq!(first, second);

        let entries = read_entries(&first).unwrap();
        assert_eq!(
            entries,
            vec![
                ("edited_a.png".to_string(), b"first".to_vec()),
                ("edited_b.png".to_string(), b"second".to_vec()),
            ]
        );
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = ArchiveWriter::new().finish().unwrap();
        assert!(read_entries(&bytes).unwrap().is_empty());
    }
}
