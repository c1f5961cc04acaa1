//! The published-files manifest (`cids.json5`).
//!
//! Written as pretty-printed JSON, which every JSON5 reader accepts. Keys are
//! kept sorted so reruns produce stable diffs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::artifacts::write_atomic;

/// Where one input file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Directory CID holding the `.enc` and `.hash` files
    pub cid: String,
    /// BLAKE3 digest of the original, pre-scrub file
    pub content_hash: String,
}

/// Original file name → published entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest written by a previous run.
    ///
    /// A missing file is an empty manifest.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let err = |message: String| PipelineError::Manifest {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| err(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(err(e.to_string())),
        }
    }

    /// Write the manifest with 2-space indentation, replacing any existing file.
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let err = |message: String| PipelineError::Manifest {
            path: path.to_path_buf(),
            message,
        };
        let mut json = serde_json::to_string_pretty(self).map_err(|e| err(e.to_string()))?;
        json.push('\n');
        write_atomic(path, json.as_bytes()).map_err(|e| err(e.to_string()))
    }

    pub fn insert(&mut self, file_name: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(file_name.into(), entry);
    }

    pub fn get(&self, file_name: &str) -> Option<&ManifestEntry> {
        self.entries.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&mut self, file_name: &str) -> Option<ManifestEntry> {
        self.entries.remove(file_name)
    }

    /// Keep only the entries whose file name satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|name, _| keep(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cid: &str) -> ManifestEntry {
        ManifestEntry {
            cid: cid.to_string(),
            content_hash: format!("{cid}-hash"),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cids.json5");

        let mut manifest = Manifest::new();
        manifest.insert("b.png", entry("bafyb"));
        manifest.insert("a.jpg", entry("bafya"));
        manifest.save(&path).unwrap();

        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cids.json5");

        let mut manifest = Manifest::new();
        manifest.insert("b.png", entry("bafyb"));
        manifest.insert("a.jpg", entry("bafya"));
        manifest.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let expected = r#"{
  "a.jpg": {
    "cid": "bafya",
    "contentHash": "bafya-hash"
  },
  "b.png": {
    "cid": "bafyb",
    "contentHash": "bafyb-hash"
  }
}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_manifest_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cids.json5");
        Manifest::new().save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn test_retain_and_remove() {
        let mut manifest = Manifest::new();
        manifest.insert("a.jpg", entry("bafya"));
        manifest.insert("b.png", entry("bafyb"));
        manifest.insert("gone.gif", entry("bafyg"));

        manifest.retain(|name| name != "gone.gif");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.remove("a.jpg"), Some(entry("bafya")));
        assert_eq!(manifest.remove("a.jpg"), None);
        assert!(manifest.get("b.png").is_some());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let manifest = Manifest::load(Path::new("/nonexistent/cids.json5")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cids.json5");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Manifest::load(&path),
            Err(PipelineError::Manifest { .. })
        ));
    }
}
