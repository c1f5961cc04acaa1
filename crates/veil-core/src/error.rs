//! Error types for the veil pipeline.
//!
//! Errors are organized by stage so a fatal run ends with a message that names
//! the file and the stage that failed.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for veil operations.
#[derive(Error, Debug)]
pub enum VeilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Operator identity errors
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors loading or using the operator's signing identity.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Failed to access mnemonic file {path}: {source}")]
    MnemonicFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid mnemonic in {path}: {message}")]
    InvalidMnemonic { path: PathBuf, message: String },

    #[error("Failed to generate mnemonic: {0}")]
    Generation(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Failures of the capability-grant callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// The network asked for a grant without one of the required fields.
    #[error("`{0}` is required.")]
    MissingField(&'static str),

    /// The operator key could not sign the statement.
    #[error("Failed to sign capability grant: {0}")]
    Signing(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input directory could not be listed, or output directory not created
    #[error("Scan failed for {path}: {message}")]
    Scan { path: PathBuf, message: String },

    /// Content digest could not be computed
    #[error("Hashing failed for {path}: {message}")]
    Hash { path: PathBuf, message: String },

    /// Metadata stripping failed
    #[error("Sanitize failed for {path}: {message}")]
    Sanitize { path: PathBuf, message: String },

    /// Threshold network rejected or failed the encryption
    #[error("Encryption failed for {path}: {message}")]
    Encrypt { path: PathBuf, message: String },

    /// Content store upload failed
    #[error("Publish failed for {path}: {message}")]
    Publish { path: PathBuf, message: String },

    /// Manifest could not be read or written
    #[error("Manifest error for {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// A non-development network tier was selected without a capacity token
    #[error("`capacity_token_id` is required on the {tier} network.")]
    MissingCapacityToken { tier: String },

    /// The capability-grant callback refused the request
    #[error("Capability grant refused: {0}")]
    Grant(#[from] GrantError),

    /// Remote collaborator error without a file context (handshake, block hash)
    #[error("{service} error: {message}")]
    Remote {
        service: String,
        message: String,
        status_code: Option<u16>,
    },
}

impl PipelineError {
    /// Attach a file path to a context-free remote error.
    ///
    /// Errors that already carry a path pass through unchanged.
    pub fn for_encrypt(self, path: &std::path::Path) -> Self {
        match self {
            PipelineError::Remote {
                service, message, ..
            } => PipelineError::Encrypt {
                path: path.to_path_buf(),
                message: format!("{service}: {message}"),
            },
            PipelineError::Grant(e) => PipelineError::Encrypt {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            other => other,
        }
    }
}

/// Convenience type alias for veil results.
pub type Result<T> = std::result::Result<T, VeilError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
