//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.supported_formats must not be empty".into(),
            ));
        }
        if self
            .scan
            .supported_formats
            .iter()
            .any(|f| f.is_empty() || f.starts_with('.'))
        {
            return Err(ConfigError::ValidationError(
                "scan.supported_formats entries must be bare extensions like \"jpg\"".into(),
            ));
        }
        if self.network.endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "network.endpoint must not be empty".into(),
            ));
        }
        if self.network.session_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "network.session_ttl_secs must be > 0".into(),
            ));
        }
        if self.network.delegation_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "network.delegation_ttl_secs must be > 0".into(),
            ));
        }
        if !is_evm_address(&self.policy.verifier_contract) {
            return Err(ConfigError::ValidationError(
                "policy.verifier_contract must be a 0x-prefixed 20-byte hex address".into(),
            ));
        }
        if let Some(storage) = &self.storage {
            if storage.api_url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "storage.api_url must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

fn is_evm_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}
