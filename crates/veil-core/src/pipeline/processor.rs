//! Pipeline orchestration - runs every input file through all stages.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::manifest::Manifest;
use crate::network::Encryptor;
use crate::storage::Publisher;

use super::artifacts::{ArtifactPaths, ArtifactState, MANIFEST_FILE};
use super::discovery::{DiscoveredFile, ScanEntry, Scanner};
use super::hash::Fingerprinter;
use super::scrub::Sanitizer;

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries that were not allowed images
    pub skipped_non_image: usize,
    /// Images whose `.enc` and `.hash` already existed
    pub skipped_existing: usize,
    /// Images scrubbed and encrypted this run
    pub encrypted: usize,
    /// Images uploaded this run
    pub published: usize,
    /// Where the manifest was written
    pub manifest_path: PathBuf,
}

/// Scrub, encrypt and publish every image in a directory.
pub struct Pipeline {
    scanner: Scanner,
    encryptor: Encryptor,
    publisher: Option<Publisher>,
}

impl Pipeline {
    /// Without a publisher, files are scrubbed and encrypted but not uploaded.
    pub fn new(config: &Config, encryptor: Encryptor, publisher: Option<Publisher>) -> Self {
        Self {
            scanner: Scanner::new(config.scan.clone()),
            encryptor,
            publisher,
        }
    }

    /// Process `dir` sequentially, stopping at the first failing file.
    ///
    /// The manifest is written whether or not the loop completed; on failure
    /// the original error is returned after the write.
    pub async fn run(&self, dir: &Path) -> PipelineResult<RunSummary> {
        let scan = self.scanner.scan(dir)?;
        let manifest_path = scan.output_dir.join(MANIFEST_FILE);

        // Entries for files still present survive, including ones this run never reaches.
        let mut manifest = Manifest::load(&manifest_path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable manifest: {e}");
            Manifest::new()
        });
        manifest.retain(|name| scan.candidates().any(|f| f.file_name == name));
        let mut summary = RunSummary {
            manifest_path: manifest_path.clone(),
            ..RunSummary::default()
        };

        let mut outcome = Ok(());
        for entry in &scan.entries {
            match entry {
                ScanEntry::Skipped(name) => {
                    tracing::info!("Skipping non-image: {name:?}.");
                    summary.skipped_non_image += 1;
                }
                ScanEntry::Candidate(file) => {
                    outcome = self
                        .process_file(file, &scan.output_dir, &mut manifest, &mut summary)
                        .await;
                    if outcome.is_err() {
                        break;
                    }
                }
            }
        }

        let saved = manifest.save(&manifest_path);
        outcome?;
        saved?;

        tracing::info!(
            "Done: {} encrypted, {} published, {} already encrypted, {} skipped",
            summary.encrypted,
            summary.published,
            summary.skipped_existing,
            summary.skipped_non_image
        );
        Ok(summary)
    }

    async fn process_file(
        &self,
        file: &DiscoveredFile,
        output_dir: &Path,
        manifest: &mut Manifest,
        summary: &mut RunSummary,
    ) -> PipelineResult<()> {
        let content_hash =
            Fingerprinter::content_hash(&file.path).map_err(|e| PipelineError::Hash {
                path: file.path.clone(),
                message: e.to_string(),
            })?;
        let paths = ArtifactPaths::new(output_dir, &content_hash, &file.ext);

        match paths.state() {
            ArtifactState::Processed => {
                tracing::info!("Skipping existing encryption: {:?}.", file.file_name);
                summary.skipped_existing += 1;
                return Ok(());
            }
            ArtifactState::Partial { enc, hash } => {
                tracing::warn!(
                    "Reprocessing {:?}: found .enc={enc}, .hash={hash}",
                    file.file_name
                );
            }
            ArtifactState::Unprocessed => {}
        }

        tracing::info!("Processing {:?} ({} bytes)", file.file_name, file.size);

        let report = Sanitizer::scrub_file(&file.path, &paths.scrubbed)?;
        let scrubbed_hash =
            Fingerprinter::content_hash(&paths.scrubbed).map_err(|e| PipelineError::Hash {
                path: paths.scrubbed.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(
            "Scrubbed {:?}: {} metadata block(s) removed from {}",
            file.file_name,
            report.removed,
            report.kind
        );
        tracing::debug!("Scrubbed digest for {:?}: {scrubbed_hash}", file.file_name);

        let artifact = self.encryptor.encrypt_file(&paths).await?;
        summary.encrypted += 1;
        tracing::debug!(
            "Encrypted {:?}: {} bytes of ciphertext",
            file.file_name,
            artifact.ciphertext_len
        );

        match &self.publisher {
            Some(publisher) => {
                let entry = publisher.publish(&paths, &content_hash).await?;
                tracing::info!("Published {:?} as {}", file.file_name, entry.cid);
                manifest.insert(file.file_name.clone(), entry);
                summary.published += 1;
            }
            // An entry from an earlier run describes content that was not just uploaded.
            None => {
                manifest.remove(&file.file_name);
            }
        }

        Ok(())
    }
}
