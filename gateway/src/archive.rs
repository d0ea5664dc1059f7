//! In-memory zip merging
//!
//! The terraform-generation service returns its files as a zip archive; the
//! gateway overlays them onto the archive the caller uploaded and returns the
//! combined result. Everything happens on byte buffers, nothing touches the
//! filesystem.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{ArchiveError, ArchiveSide};

/// Bounds applied to a single merge so a hostile archive cannot exhaust
/// memory while its entries are inflated.
#[derive(Debug, Clone, Copy)]
pub struct MergeLimits {
    /// Maximum combined number of entries across both archives.
    pub max_entries: usize,
    /// Maximum combined uncompressed size in bytes.
    pub max_total_bytes: u64,
}

impl Default for MergeLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Merge `overlay` into `base`; overlay entries win on path collision.
///
/// Base entries not shadowed by the overlay are carried over unchanged.
/// Entry paths are compared byte-for-byte, so `a.tf` and `dir/a.tf` never
/// collide and a directory entry `a/` never shadows a file `a`.
pub fn merge(base: &[u8], overlay: &[u8], limits: &MergeLimits) -> Result<Vec<u8>, ArchiveError> {
    let mut base_zip = open(base, ArchiveSide::Base)?;
    let mut overlay_zip = open(overlay, ArchiveSide::Overlay)?;

    let total_entries = base_zip.len() + overlay_zip.len();
    if total_entries > limits.max_entries {
        return Err(ArchiveError::LimitExceeded(format!(
            "{total_entries} entries, cap is {}",
            limits.max_entries
        )));
    }

    let mut writer = MergeWriter::new(limits);
    // Overlay entries are written first so they shadow base entries on
    // collision.
    writer.copy_from(&mut overlay_zip, ArchiveSide::Overlay)?;
    writer.copy_from(&mut base_zip, ArchiveSide::Base)?;
    writer.finish()
}

fn open(bytes: &[u8], side: ArchiveSide) -> Result<ZipArchive<Cursor<&[u8]>>, ArchiveError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ArchiveError::Malformed {
        which: side,
        message: e.to_string(),
    })
}

struct MergeWriter {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    written: HashSet<String>,
    remaining: u64,
    cap: u64,
}

impl MergeWriter {
    fn new(limits: &MergeLimits) -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            written: HashSet::new(),
            remaining: limits.max_total_bytes,
            cap: limits.max_total_bytes,
        }
    }

    /// Append every entry of `source` that has not been written yet.
    fn copy_from(
        &mut self,
        source: &mut ZipArchive<Cursor<&[u8]>>,
        side: ArchiveSide,
    ) -> Result<(), ArchiveError> {
        for index in 0..source.len() {
            let mut entry = source.by_index(index).map_err(|e| ArchiveError::Malformed {
                which: side,
                message: e.to_string(),
            })?;
            let name = entry.name().to_string();
            if self.written.contains(&name) {
                continue;
            }

            if entry.is_dir() {
                self.writer
                    .add_directory(name.as_str(), self.options)
                    .map_err(|e| ArchiveError::Write(e.to_string()))?;
                self.written.insert(name);
                continue;
            }

            let data = match read_capped(&mut entry, self.remaining) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    return Err(ArchiveError::LimitExceeded(format!(
                        "uncompressed size exceeds the {} byte cap",
                        self.cap
                    )))
                }
                Err(e) => {
                    return Err(ArchiveError::Malformed {
                        which: side,
                        message: e.to_string(),
                    })
                }
            };
            self.remaining -= data.len() as u64;

            self.writer
                .start_file(name.as_str(), self.options)
                .map_err(|e| ArchiveError::Write(e.to_string()))?;
            self.writer
                .write_all(&data)
                .map_err(|e| ArchiveError::Write(e.to_string()))?;
            self.written.insert(name);
        }

        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| ArchiveError::Write(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Read an entry, refusing to inflate past `remaining` bytes.
///
/// Declared sizes in the central directory are untrusted; the cap is applied
/// to the bytes actually produced.
fn read_capped<R: Read>(entry: R, remaining: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut data = Vec::new();
    entry
        .take(remaining.saturating_add(1))
        .read_to_end(&mut data)?;
    if data.len() as u64 > remaining {
        return Ok(None);
    }
    Ok(Some(data))
}
