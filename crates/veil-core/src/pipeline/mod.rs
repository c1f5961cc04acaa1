//! Image processing pipeline components.
//!
//! Stages, in the order each file passes through them:
//! - **discovery**: List the input directory and pick out images
//! - **hash**: Fingerprint the original bytes (artifact name)
//! - **scrub**: Strip embedded metadata
//! - **metadata**: Verify nothing identifying survived
//! - **artifacts**: Derived paths, idempotence state, atomic writes
//! - **processor**: Orchestrates the full pipeline

pub mod artifacts;
pub mod discovery;
pub mod hash;
pub mod metadata;
pub mod processor;
pub mod scrub;

// Re-exports for convenient access
pub use artifacts::{ArtifactPaths, ArtifactState, MANIFEST_FILE, OUTPUT_DIR};
pub use discovery::{DiscoveredFile, ScanEntry, ScanResult, Scanner};
pub use hash::{ContentHash, Fingerprinter};
pub use metadata::MetadataProbe;
pub use processor::{Pipeline, RunSummary};
pub use scrub::{ImageKind, Sanitizer, ScrubReport};
