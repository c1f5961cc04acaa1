//! Veil Core - scrub, seal and publish image collections.
//!
//! Every image in a directory is stripped of embedded metadata, encrypted so
//! that only members of a zero-knowledge group can decrypt it, and published
//! to content-addressed storage:
//!
//! ```text
//! Scan → Fingerprint → Scrub → Encrypt (threshold network) → Publish → cids.json5
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use veil_core::{Config, Veil};
//!
//! #[tokio::main]
//! async fn main() -> veil_core::Result<()> {
//!     let config = Config::load()?;
//!     let veil = Veil::new(config).await?;
//!
//!     let summary = veil.run("./listing-photos".as_ref()).await?;
//!     println!("Manifest: {}", summary.manifest_path.display());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod access;
pub mod config;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod network;
pub mod pipeline;
pub mod storage;

use std::path::Path;

// Re-exports for convenient access
pub use access::{AccessPolicy, CapabilityGrantor, WalletGrantor};
pub use config::Config;
pub use error::{ConfigError, GrantError, IdentityError, PipelineError, PipelineResult, Result, VeilError};
pub use identity::{Mnemonic, OperatorWallet};
pub use manifest::{Manifest, ManifestEntry};
pub use network::{Encryptor, GatewayClient, ThresholdNetwork};
pub use pipeline::{Pipeline, RunSummary};
pub use storage::{ContentStore, IpfsStore, Publisher};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Veil processor - the pipeline wired to the configured network and store.
pub struct Veil {
    config: Config,
    pipeline: Pipeline,
}

impl Veil {
    /// Build the production pipeline from configuration.
    ///
    /// The capacity-token precondition is checked before the mnemonic file is
    /// touched, so a misconfigured paid tier fails without side effects.
    pub async fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing veil v{}", VERSION);
        network::check_capacity(&config.network)?;

        let mnemonic = Mnemonic::load_or_generate(&config.mnemonic_path())?;
        let wallet = OperatorWallet::from_mnemonic(&mnemonic)?;
        tracing::debug!("Operator address: {}", wallet.address());

        let encryptor = Encryptor::new(
            Box::new(GatewayClient::new(&config.network)),
            wallet,
            AccessPolicy::group_membership(&config.policy),
            config.network.clone(),
        )?;

        let publisher = match config.storage_credentials() {
            Some(credentials) => Some(Publisher::new(Box::new(IpfsStore::new(credentials)))),
            None => {
                tracing::info!("Storage not configured; encrypted files will not be published.");
                None
            }
        };

        let pipeline = Pipeline::new(&config, encryptor, publisher);
        Ok(Self { config, pipeline })
    }

    /// Process every image in `dir`.
    pub async fn run(&self, dir: &Path) -> Result<RunSummary> {
        Ok(self.pipeline.run(dir).await?)
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
