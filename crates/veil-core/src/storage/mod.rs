//! Content-addressed publishing of encrypted artifacts.

pub mod ipfs;

pub use ipfs::IpfsStore;

use async_trait::async_trait;

use crate::error::{PipelineError, PipelineResult};
use crate::manifest::ManifestEntry;
use crate::pipeline::artifacts::ArtifactPaths;
use crate::pipeline::hash::ContentHash;

/// A named file inside an uploaded directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Trait every content store implements.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Upload `files` as one directory and return the directory CID.
    async fn upload_directory(&self, files: &[UploadFile]) -> PipelineResult<String>;
}

/// Uploads a file's `.enc` and `.hash` pair and produces its manifest entry.
///
/// The entry records the original file's content hash next to the CID.
pub struct Publisher {
    store: Box<dyn ContentStore>,
}

impl Publisher {
    pub fn new(store: Box<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn publish(
        &self,
        paths: &ArtifactPaths,
        content_hash: &ContentHash,
    ) -> PipelineResult<ManifestEntry> {
        let err = |message: String| PipelineError::Publish {
            path: paths.enc.clone(),
            message,
        };

        let mut files = Vec::with_capacity(2);
        for path in [&paths.enc, &paths.hash] {
            let bytes = std::fs::read(path).map_err(|e| err(format!("{}: {e}", path.display())))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push(UploadFile { name, bytes });
        }

        let cid = self.store.upload_directory(&files).await.map_err(|e| match e {
            PipelineError::Remote {
                service, message, ..
            } => err(format!("{service}: {message}")),
            other => other,
        })?;

        tracing::debug!("Published {} to {} as {cid}", files[0].name, self.store.name());
        Ok(ManifestEntry {
            cid,
            content_hash: content_hash.to_string(),
        })
    }
}
