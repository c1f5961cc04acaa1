//! Operator identity: the seed phrase on disk and the wallet derived from it.
//!
//! The same wallet signs every statement the threshold network asks for, so
//! the phrase is generated once and reused across runs.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::{English, Mnemonic as Bip39Mnemonic};
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use alloy::signers::SignerSync;

use crate::error::IdentityError;

/// Number of words in a generated phrase.
pub const MNEMONIC_WORDS: usize = 24;

/// A BIP-39 seed phrase loaded from (or freshly written to) disk.
pub struct Mnemonic {
    phrase: String,
    path: PathBuf,
}

impl std::fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mnemonic")
            .field("words", &self.word_count())
            .field("path", &self.path)
            .finish()
    }
}

impl Mnemonic {
    /// Read the phrase at `path`, generating and persisting a new one if absent.
    pub fn load_or_generate(path: &Path) -> Result<Self, IdentityError> {
        let io_err = |source| IdentityError::MnemonicFile {
            path: path.to_path_buf(),
            source,
        };

        let phrase = if path.exists() {
            std::fs::read_to_string(path).map_err(io_err)?
        } else {
            let phrase = generate_phrase()?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            write_private(path, phrase.trim()).map_err(io_err)?;
            tracing::info!("Generated new {MNEMONIC_WORDS} word mnemonic at {:?}", path);
            phrase
        };

        let mnemonic = Self {
            phrase: phrase.trim().to_string(),
            path: path.to_path_buf(),
        };
        tracing::debug!(
            "Using {} word mnemonic from `{}`.",
            mnemonic.word_count(),
            path.display()
        );
        Ok(mnemonic)
    }

    /// Number of whitespace-separated words in the phrase.
    pub fn word_count(&self) -> usize {
        self.phrase.split_whitespace().count()
    }

    /// Where the phrase lives on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn phrase(&self) -> &str {
        &self.phrase
    }
}

fn generate_phrase() -> Result<String, IdentityError> {
    let mut rng = rand::thread_rng();
    let mnemonic = Bip39Mnemonic::<English>::new_with_count(&mut rng, MNEMONIC_WORDS)
        .map_err(|e| IdentityError::Generation(e.to_string()))?;
    Ok(mnemonic.to_phrase())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// The first Ethereum account derived from the operator's mnemonic.
pub struct OperatorWallet {
    signer: PrivateKeySigner,
}

impl std::fmt::Debug for OperatorWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorWallet")
            .field("address", &self.address())
            .finish()
    }
}

impl OperatorWallet {
    /// Derive the wallet at `m/44'/60'/0'/0/0`.
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Result<Self, IdentityError> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(mnemonic.phrase())
            .build()
            .map_err(|e| IdentityError::InvalidMnemonic {
                path: mnemonic.path().to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self { signer })
    }

    /// Checksummed account address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-191 `personal_sign` over `message`, returned as 0x-prefixed hex.
    pub fn sign_message(&self, message: &str) -> Result<String, IdentityError> {
        let signature = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| IdentityError::Signing(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}
