//! Log file reading with sanitization and timestamp slicing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::ingest::error::{IngestError, IngestResult};
use crate::ingest::tokenizer::Tokenizer;
use crate::model::LogLine;

const PROGRESS_INTERVAL: usize = 100_000;

/// Reads raw log data into [`LogLine`] records.
///
/// Accepts a single file or a directory; directories are walked and regular
/// files are read in lexicographic path order so ingestion is deterministic.
#[derive(Debug)]
pub struct LogReader {
    timestamp_length: usize,
    tokenizer: Tokenizer,
}

impl LogReader {
    pub fn new(timestamp_length: usize, tokenizer: Tokenizer) -> Self {
        Self {
            timestamp_length,
            tokenizer,
        }
    }

    /// Read every usable line under `path` and assign line identifiers in
    /// ingestion order.
    pub fn read(&self, path: &Path) -> IngestResult<Vec<LogLine>> {
        if !path.exists() {
            return Err(IngestError::InputNotFound(path.to_path_buf()));
        }

        let mut lines = Vec::new();
        if path.is_dir() {
            for file in self.collect_files(path)? {
                debug!("reading {}", file.display());
                self.read_file(&file, &mut lines)?;
            }
        } else {
            self.read_file(path, &mut lines)?;
        }
        Ok(lines)
    }

    fn collect_files(&self, dir: &Path) -> IngestResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| {
                let source = e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "walk failed")
                });
                IngestError::read(dir, source)
            })?;
            if entry.file_type().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path, lines: &mut Vec<LogLine>) -> IngestResult<()> {
        let file = File::open(path).map_err(|e| IngestError::read(path, e))?;
        let reader = BufReader::new(file);

        for raw in reader.split(b'\n') {
            let raw = raw.map_err(|e| IngestError::read(path, e))?;
            if let Some(line) = self.parse_line(lines.len(), &raw) {
                lines.push(line);
                if lines.len() % PROGRESS_INTERVAL == 0 {
                    info!("{} lines imported", lines.len());
                }
            }
        }
        Ok(())
    }

    /// Sanitize one raw line and slice off the timestamp prefix. Returns None
    /// for lines too short to carry content.
    fn parse_line(&self, id: usize, raw: &[u8]) -> Option<LogLine> {
        let sanitized = sanitize(raw);
        let line = sanitized.trim();
        if line.len() < 2 {
            return None;
        }

        let (timestamp, remainder) = if self.timestamp_length == 0 {
            ("", line)
        } else if line.len() > self.timestamp_length {
            let (stamp, rest) = line.split_at(self.timestamp_length);
            // The character right after the timestamp is the field separator.
            (stamp, &rest[1..])
        } else {
            (line, "")
        };

        let tokens = self.tokenizer.tokenize(remainder);
        Some(LogLine::new(
            id,
            timestamp.to_string(),
            remainder.to_string(),
            tokens,
        ))
    }
}

/// Keep printable ASCII (0x20..=0x7e) plus TAB, drop everything else.
///
/// The result is pure single-byte ASCII, which makes the timestamp byte
/// slicing above safe.
fn sanitize(raw: &[u8]) -> String {
    raw.iter()
        .copied()
        .filter(|&b| (31 < b && b < 127) || b == 9)
        .map(char::from)
        .collect()
}
