//! Record encoding
//!
//! This module encodes merged records as a JSON array of flat objects and
//! compresses it with gzip. Timestamps are rendered as `YYYY-MM-DDTHH:MM:SS`
//! by the record's serializer.

use crate::config::MAX_COMPRESSION_LEVEL;
use crate::error::ComputeError;
use crate::types::MergedRecord;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default gzip level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Gzip JSON encoder for merged records
pub struct RecordEncoder {
    compression: Compression,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl RecordEncoder {
    /// Create an encoder; levels above 9 are clamped
    pub fn new(compression_level: u32) -> Self {
        Self {
            compression: Compression::new(compression_level.min(MAX_COMPRESSION_LEVEL)),
        }
    }

    /// Encode records to an uncompressed JSON array
    pub fn encode_to_json(&self, records: &[MergedRecord]) -> Result<String, ComputeError> {
        serde_json::to_string(records).map_err(ComputeError::JsonError)
    }

    /// Write gzip-compressed JSON to any sink and hand the sink back
    pub fn write_gzip<W: Write>(&self, records: &[MergedRecord], sink: W) -> io::Result<W> {
        let mut encoder = GzEncoder::new(sink, self.compression);
        serde_json::to_writer(&mut encoder, records)?;
        encoder.finish()
    }

    /// Write gzip-compressed JSON to a file.
    ///
    /// Data goes to a sibling `.partial` file first and is renamed into place
    /// once complete, so a failed write never leaves a truncated output.
    pub fn write_file(&self, records: &[MergedRecord], path: &Path) -> Result<(), ComputeError> {
        let partial = partial_path(path);
        let output_error = |source: io::Error| ComputeError::OutputWrite {
            path: path.display().to_string(),
            source,
        };

        let result = File::create(&partial)
            .and_then(|file| self.write_gzip(records, BufWriter::new(file)))
            .and_then(|mut writer| writer.flush())
            .and_then(|_| fs::rename(&partial, path));

        if let Err(e) = result {
            // Cleanup failure is ignored, the write error is what gets reported
            let _ = fs::remove_file(&partial);
            return Err(output_error(e));
        }

        tracing::info!(records = records.len(), path = %path.display(), "wrote compressed records");
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".partial");
    path.with_file_name(name)
}
