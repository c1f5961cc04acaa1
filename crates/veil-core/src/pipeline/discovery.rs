//! Input directory scanning.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::artifacts::OUTPUT_DIR;
use crate::config::ScanConfig;
use crate::error::{PipelineError, PipelineResult};

/// Lists the top level of an input directory.
pub struct Scanner {
    config: ScanConfig,
}

/// An image file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File name as it appears in the directory (manifest key)
    pub file_name: String,
    /// Extension without the dot, original case
    pub ext: String,
    /// File size in bytes
    pub size: u64,
}

/// One directory entry, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEntry {
    Candidate(DiscoveredFile),
    /// Not an allowed image; carries the entry name
    Skipped(String),
}

/// Result of scanning a directory.
#[derive(Debug)]
pub struct ScanResult {
    /// `{dir}/scrubbed-images`, created if it was absent
    pub output_dir: PathBuf,
    /// Entries in file-name order
    pub entries: Vec<ScanEntry>,
}

impl ScanResult {
    pub fn candidates(&self) -> impl Iterator<Item = &DiscoveredFile> {
        self.entries.iter().filter_map(|e| match e {
            ScanEntry::Candidate(f) => Some(f),
            ScanEntry::Skipped(_) => None,
        })
    }
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Classify the entries of `dir` and create the output directory.
    ///
    /// Not recursive. Subdirectories are reported as skipped, except the
    /// output directory, which is left out entirely.
    pub fn scan(&self, dir: &Path) -> PipelineResult<ScanResult> {
        let err = |message: String| PipelineError::Scan {
            path: dir.to_path_buf(),
            message,
        };

        if !dir.is_dir() {
            return Err(err("not a directory".to_string()));
        }

        let output_dir = dir.join(OUTPUT_DIR);
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| err(format!("cannot create {OUTPUT_DIR}: {e}")))?;

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| err(e.to_string()))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().is_dir() && file_name == OUTPUT_DIR {
                continue;
            }

            let ext = match self.allowed_extension(entry.path()) {
                Some(ext) if entry.file_type().is_file() => ext,
                _ => {
                    entries.push(ScanEntry::Skipped(file_name));
                    continue;
                }
            };

            let size = entry.metadata().map_err(|e| err(e.to_string()))?.len();
            entries.push(ScanEntry::Candidate(DiscoveredFile {
                path: entry.into_path(),
                file_name,
                ext,
                size,
            }));
        }

        Ok(ScanResult {
            output_dir,
            entries,
        })
    }

    /// The file's extension, if it is on the allow-list.
    fn allowed_extension(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        let ext_lower = ext.to_lowercase();
        self.config
            .supported_formats
            .iter()
            .any(|fmt| fmt.to_lowercase() == ext_lower)
            .then(|| ext.to_string())
    }
}
