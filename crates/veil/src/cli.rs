//! Config loading and the single `veil <dir>` command.

use anyhow::Context;
use std::path::Path;
use veil_core::{Config, RunSummary, Veil};

/// Exit status for any error that ends the run.
pub const FATAL_EXIT_CODE: u8 = 5;

/// Load the config file named on the command line, or the default one.
///
/// A broken default config falls back to defaults with a warning; a broken
/// explicit one is an error.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load().unwrap_or_else(|e| {
            eprintln!(
                "Warning: Failed to load config: {e}\n  Using default configuration from {}.",
                Config::default_path().display()
            );
            Config::default()
        })),
    }
}

/// Build the pipeline and run it over `dir`.
pub async fn execute(config: Config, dir: &Path) -> anyhow::Result<RunSummary> {
    let veil = Veil::new(config).await?;
    let summary = veil
        .run(dir)
        .await
        .with_context(|| format!("Processing {} failed", dir.display()))?;
    tracing::info!("Manifest written to {}", summary.manifest_path.display());
    Ok(summary)
}

/// Log a fatal error and map the outcome to a process exit status.
pub fn exit_status<T>(result: &anyhow::Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => {
            tracing::error!("{e:#}");
            FATAL_EXIT_CODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::config::NetworkTier;

    #[test]
    fn test_explicit_missing_config_is_error() {
        let err = load_config(Some(Path::new("/nonexistent/veil.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/veil.toml"));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.toml");
        std::fs::write(&path, "[network]\ntier = \"datil-test\"\ncapacity_token_id = \"9\"\n")
            .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.network.tier, NetworkTier::DatilTest);
        assert_eq!(config.network.capacity_token_id.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn test_missing_capacity_token_exits_5() {
        let home = tempfile::tempdir().unwrap();
        let input = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("photo.jpg"), b"\xFF\xD8\xFF").unwrap();

        let mut config = Config::default();
        config.general.mnemonic_path = home.path().join("mnemonic.txt");
        config.network.tier = NetworkTier::Datil;

        let result = execute(config, input.path()).await;
        assert_eq!(exit_status(&result), FATAL_EXIT_CODE);
        assert!(!input.path().join("scrubbed-images").exists());
        assert!(!home.path().join("mnemonic.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_exits_5() {
        let home = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.mnemonic_path = home.path().join("mnemonic.txt");

        let result = execute(config, Path::new("/nonexistent/photos")).await;
        assert_eq!(exit_status(&result), FATAL_EXIT_CODE);
    }

    #[test]
    fn test_success_exits_0() {
        let result: anyhow::Result<()> = Ok(());
        assert_eq!(exit_status(&result), 0);
    }
}
