//! Candidate file enumeration.
//!
//! Scans every MIDI file in a directory. Files that fail to scan are skipped
//! and recorded; they never abort the enumeration.

use crate::error::{Result, ScanError};
use crate::metadata::FileMetadata;
use crate::scanner::scan;
use crate::stream::SmfSource;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `.mid` or `.midi`, any case.
pub fn is_midi_file_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
        .unwrap_or(false)
}

/// Scan one file, buffering it in memory when possible.
pub fn scan_path(path: impl AsRef<Path>) -> Result<FileMetadata> {
    let file = File::open(path.as_ref())?;
    let mut source = SmfSource::open(file)?;
    scan(&mut source)
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

impl CatalogEntry {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: ScanError,
}

/// Scanned MIDI files of one directory, sorted by file name.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    skipped: Vec<SkippedFile>,
}

impl Catalog {
    pub fn scan_dir(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| is_midi_file_name(path))
            .collect();
        candidates.sort();

        debug!("Scanning {} MIDI candidates in {}", candidates.len(), dir.display());

        let mut catalog = Self::default();
        for path in candidates {
            match scan_path(&path) {
                Ok(metadata) => catalog.entries.push(CatalogEntry { path, metadata }),
                Err(error) => {
                    warn!("Failed to scan {}: {}", path.display(), error);
                    catalog.skipped.push(SkippedFile { path, error });
                }
            }
        }
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move a selection by `delta` entries, stopping at either end.
    pub fn step(&self, index: usize, delta: i64) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let last = self.entries.len() as i64 - 1;
        (index as i64).saturating_add(delta).clamp(0, last) as usize
    }

    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.entries
    }
}
