//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Seed phrase file holding the operator's signing identity
    pub mnemonic_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            mnemonic_path: PathBuf::from("~/.veil/mnemonic.txt"),
        }
    }
}

/// Directory scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extensions (without dot) accepted as images, matched case-insensitively
    pub supported_formats: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            supported_formats: ["jpg", "jpeg", "png", "tiff", "tif", "gif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Threshold network deployment tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkTier {
    /// Free development network; no capacity credits needed
    #[default]
    DatilDev,
    /// Paid test network
    DatilTest,
    /// Production network
    Datil,
}

impl NetworkTier {
    /// Whether requests on this tier must be paid for with a capacity token.
    pub fn requires_capacity(&self) -> bool {
        !matches!(self, NetworkTier::DatilDev)
    }
}

impl fmt::Display for NetworkTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkTier::DatilDev => write!(f, "datil-dev"),
            NetworkTier::DatilTest => write!(f, "datil-test"),
            NetworkTier::Datil => write!(f, "datil"),
        }
    }
}

/// Threshold-encryption network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Deployment tier
    pub tier: NetworkTier,

    /// Gateway endpoint for handshake, block hash and encryption
    pub endpoint: String,

    /// Chain the access condition is evaluated on
    pub chain: String,

    /// EVM chain id used in signed statements
    pub chain_id: u64,

    /// Capacity credit token id (required unless tier is datil-dev)
    pub capacity_token_id: Option<String>,

    /// Lifetime of session signatures, in seconds
    pub session_ttl_secs: u64,

    /// Lifetime of the capacity delegation signature, in seconds
    pub delegation_ttl_secs: u64,

    /// Domain placed in signed statements
    pub siwe_domain: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tier: NetworkTier::default(),
            endpoint: "http://localhost:7470".to_string(),
            chain: "sepolia".to_string(),
            chain_id: 11_155_111,
            capacity_token_id: None,
            session_ttl_secs: 24 * 60 * 60,
            delegation_ttl_secs: 7 * 24 * 60 * 60,
            siwe_domain: "localhost".to_string(),
        }
    }
}

/// Access policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Semaphore proof verifier contract
    pub verifier_contract: String,

    /// Chain the verifier is deployed on
    pub chain: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            verifier_contract: "0xb908Bcb798e5353fB90155C692BddE3b4937217C".to_string(),
            chain: "sepolia".to_string(),
        }
    }
}

/// Content-addressed storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// IPFS HTTP API base URL
    pub api_url: String,

    /// Space (account namespace) uploads are billed to
    pub space: String,

    /// Bearer token (supports ${ENV_VAR} syntax)
    pub token: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5001".to_string(),
            space: String::new(),
            token: "${VEIL_STORAGE_TOKEN}".to_string(),
        }
    }
}

/// Resolved storage credentials.
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub api_url: String,
    pub space: String,
    pub token: String,
}

impl StorageConfig {
    /// Credentials for uploading, or `None` when the account is not configured.
    pub fn credentials(&self) -> Option<StorageCredentials> {
        if self.space.is_empty() || self.api_url.is_empty() {
            return None;
        }
        let token = resolve_env_var(&self.token)?;
        Some(StorageCredentials {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            space: self.space.clone(),
            token,
        })
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
