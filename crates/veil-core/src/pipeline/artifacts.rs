//! Derived artifact paths and their processing state.
//!
//! Every file written here goes through a temp file in the same directory and
//! a rename, so a crash never leaves a truncated `.enc` or `.hash` behind.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::hash::ContentHash;

/// Name of the output subdirectory inside the input directory.
pub const OUTPUT_DIR: &str = "scrubbed-images";

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "cids.json5";

/// Paths of everything derived from one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `{hash}.scrubbed{ext}`
    pub scrubbed: PathBuf,
    /// `{hash}.scrubbed{ext}.enc`
    pub enc: PathBuf,
    /// `{hash}.scrubbed{ext}.hash`
    pub hash: PathBuf,
}

impl ArtifactPaths {
    /// `ext` is the original extension without the dot, case preserved.
    pub fn new(output_dir: &Path, content_hash: &ContentHash, ext: &str) -> Self {
        let scrubbed = output_dir.join(format!("{content_hash}.scrubbed.{ext}"));
        let enc = with_suffix(&scrubbed, ".enc");
        let hash = with_suffix(&scrubbed, ".hash");
        Self {
            scrubbed,
            enc,
            hash,
        }
    }

    /// Inspect the filesystem for this file's state.
    pub fn state(&self) -> ArtifactState {
        match (self.enc.is_file(), self.hash.is_file()) {
            (true, true) => ArtifactState::Processed,
            (false, false) => ArtifactState::Unprocessed,
            (enc, hash) => ArtifactState::Partial { enc, hash },
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Where a file stands in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Neither ciphertext nor hash exist
    Unprocessed,
    /// Only one of the pair exists; reprocessed from scratch
    Partial { enc: bool, hash: bool },
    /// Both exist; the file is skipped
    Processed,
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> ContentHash {
        ContentHash::from_bytes(b"fixture")
    }

    #[test]
    fn test_paths_layout() {
        let paths = ArtifactPaths::new(Path::new("/in/scrubbed-images"), &hash(), "JPG");
        let name = paths.scrubbed.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, format!("{}.scrubbed.JPG", hash()));
        assert_eq!(
            paths.enc.file_name().unwrap().to_str().unwrap(),
            format!("{name}.enc")
        );
        assert_eq!(
            paths.hash.file_name().unwrap().to_str().unwrap(),
            format!("{name}.hash")
        );
    }

    #[test]
    fn test_state_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), &hash(), "png");
        assert_eq!(paths.state(), ArtifactState::Unprocessed);

        write_atomic(&paths.enc, b"cipher").unwrap();
        assert_eq!(
            paths.state(),
            ArtifactState::Partial {
                enc: true,
                hash: false
            }
        );

        write_atomic(&paths.hash, b"abc").unwrap();
        assert_eq!(paths.state(), ArtifactState::Processed);
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
