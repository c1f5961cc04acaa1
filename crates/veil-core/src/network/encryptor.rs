//! Access-gated encryption of scrubbed artifacts.

use std::path::Path;

use base64::Engine;
use chrono::{Duration, Utc};

use super::session::SessionKey;
use super::{EncryptRequest, ThresholdNetwork};
use crate::access::{AccessPolicy, ResourceAbilityRequest, WalletGrantor};
use crate::config::NetworkConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::identity::OperatorWallet;
use crate::pipeline::artifacts::{write_atomic, ArtifactPaths};

/// What was persisted for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedArtifact {
    /// Ciphertext size in bytes
    pub ciphertext_len: usize,
    /// Hash the network requires to authorize decryption
    pub data_to_encrypt_hash: String,
}

/// Encrypts scrubbed files under the access policy.
pub struct Encryptor {
    network: Box<dyn ThresholdNetwork>,
    wallet: OperatorWallet,
    policy: AccessPolicy,
    settings: NetworkConfig,
}

impl Encryptor {
    /// Fails before any network traffic when a paid tier has no capacity token.
    pub fn new(
        network: Box<dyn ThresholdNetwork>,
        wallet: OperatorWallet,
        policy: AccessPolicy,
        settings: NetworkConfig,
    ) -> PipelineResult<Self> {
        check_capacity(&settings)?;
        Ok(Self {
            network,
            wallet,
            policy,
            settings,
        })
    }

    /// Encrypt `paths.scrubbed` and write `paths.enc` then `paths.hash`.
    pub async fn encrypt_file(&self, paths: &ArtifactPaths) -> PipelineResult<EncryptedArtifact> {
        let path = paths.scrubbed.as_path();
        let plaintext = tokio::fs::read(path)
            .await
            .map_err(|e| encrypt_err(path, format!("Cannot read scrubbed file: {e}")))?;

        tracing::debug!(
            "Encrypting: {:?} via {} ({})",
            path,
            self.network.name(),
            self.settings.tier
        );

        let handshake = self
            .network
            .connect()
            .await
            .map_err(|e| e.for_encrypt(path))?;
        let blockhash = self
            .network
            .latest_blockhash()
            .await
            .map_err(|e| e.for_encrypt(path))?;

        let grantor = WalletGrantor::new(
            &self.wallet,
            &blockhash,
            &self.settings.siwe_domain,
            self.settings.chain_id,
        );

        let capacity = if self.settings.tier.requires_capacity() {
            let token_id = check_capacity(&self.settings)?;
            let expiration = Utc::now() + ttl(self.settings.delegation_ttl_secs);
            Some(
                grantor
                    .capacity_delegation(token_id, 1, expiration)
                    .map_err(|e| PipelineError::from(e).for_encrypt(path))?,
            )
        } else {
            None
        };

        let session_sigs = SessionKey::generate()
            .sign_for_nodes(
                &handshake.nodes,
                &[ResourceAbilityRequest::decrypt_any()],
                Utc::now() + ttl(self.settings.session_ttl_secs),
                capacity,
                &grantor,
            )
            .map_err(|e| e.for_encrypt(path))?;

        let request = EncryptRequest {
            data_to_encrypt: base64::engine::general_purpose::STANDARD.encode(&plaintext),
            chain: self.settings.chain.clone(),
            evm_contract_conditions: self.policy.conditions().to_vec(),
            session_sigs,
        };
        let response = self
            .network
            .encrypt(&request)
            .await
            .map_err(|e| e.for_encrypt(path))?;

        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(response.ciphertext.as_bytes())
            .map_err(|e| encrypt_err(path, format!("Ciphertext is not valid base64: {e}")))?;
        if response.data_to_encrypt_hash.is_empty() {
            return Err(encrypt_err(path, "Network returned an empty hash".to_string()));
        }

        write_atomic(&paths.enc, &ciphertext)
            .map_err(|e| encrypt_err(&paths.enc, format!("Cannot write ciphertext: {e}")))?;
        write_atomic(&paths.hash, response.data_to_encrypt_hash.as_bytes())
            .map_err(|e| encrypt_err(&paths.hash, format!("Cannot write hash: {e}")))?;

        tracing::debug!("Wrote {:?}.(enc|hash)", path);

        Ok(EncryptedArtifact {
            ciphertext_len: ciphertext.len(),
            data_to_encrypt_hash: response.data_to_encrypt_hash,
        })
    }
}

/// The configured capacity token, or an error if the tier needs one and none is set.
///
/// Returns an empty id on the development tier when no token is configured.
pub fn check_capacity(settings: &NetworkConfig) -> PipelineResult<&str> {
    match settings.capacity_token_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ if settings.tier.requires_capacity() => Err(PipelineError::MissingCapacityToken {
            tier: settings.tier.to_string(),
        }),
        _ => Ok(""),
    }
}

/// Ten years; longer lifetimes are clamped.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn ttl(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}

fn encrypt_err(path: &Path, message: String) -> PipelineError {
    PipelineError::Encrypt {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{NetworkTier, PolicyConfig};
    use crate::error::PipelineResult;
    use crate::identity::Mnemonic;
    use crate::network::{EncryptResponse, Handshake};
    use crate::pipeline::hash::ContentHash;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-process threshold network that "encrypts" by reversing bytes.
    #[derive(Clone, Default)]
    pub(crate) struct FakeNetwork {
        pub calls: Arc<AtomicUsize>,
        pub last_request: Arc<Mutex<Option<serde_json::Value>>>,
        pub reject_with: Option<String>,
    }

    #[async_trait]
    impl ThresholdNetwork for FakeNetwork {
        fn name(&self) -> &str {
            "fake"
        }

        async fn connect(&self) -> PipelineResult<Handshake> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Handshake {
                nodes: vec!["https://node-1".to_string(), "https://node-2".to_string()],
            })
        }

        async fn latest_blockhash(&self) -> PipelineResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("0x5eed".to_string())
        }

        async fn encrypt(&self, request: &EncryptRequest) -> PipelineResult<EncryptResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(serde_json::to_value(request).unwrap());
            if let Some(message) = &self.reject_with {
                return Err(PipelineError::Remote {
                    service: "threshold network".to_string(),
                    message: message.clone(),
                    status_code: Some(400),
                });
            }
            let engine = base64::engine::general_purpose::STANDARD;
            let mut data = engine.decode(&request.data_to_encrypt).unwrap();
            let hash = ContentHash::from_bytes(&data).to_string();
            data.reverse();
            Ok(EncryptResponse {
                ciphertext: engine.encode(&data),
                data_to_encrypt_hash: hash,
            })
        }
    }

    pub(crate) fn test_wallet(dir: &Path) -> OperatorWallet {
        let path = dir.join("mnemonic.txt");
        if !path.exists() {
            std::fs::write(
                &path,
                "test test test test test test test test test test test junk",
            )
            .unwrap();
        }
        OperatorWallet::from_mnemonic(&Mnemonic::load_or_generate(&path).unwrap()).unwrap()
    }

    fn encryptor(dir: &Path, network: FakeNetwork, settings: NetworkConfig) -> Encryptor {
        Encryptor::new(
            Box::new(network),
            test_wallet(dir),
            AccessPolicy::group_membership(&PolicyConfig::default()),
            settings,
        )
        .unwrap()
    }

    fn scrubbed_fixture(dir: &Path) -> ArtifactPaths {
        let paths = ArtifactPaths::new(dir, &ContentHash::from_bytes(b"x"), "jpg");
        std::fs::write(&paths.scrubbed, b"scrubbed image bytes").unwrap();
        paths
    }

    #[test]
    fn test_paid_tier_without_token_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork::default();
        let calls = network.calls.clone();
        let settings = NetworkConfig {
            tier: NetworkTier::Datil,
            ..NetworkConfig::default()
        };
        let err = Encryptor::new(
            Box::new(network),
            test_wallet(dir.path()),
            AccessPolicy::group_membership(&PolicyConfig::default()),
            settings,
        )
        .err()
        .unwrap();
        assert!(matches!(err, PipelineError::MissingCapacityToken { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_writes_enc_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scrubbed_fixture(dir.path());
        let network = FakeNetwork::default();
        let enc = encryptor(dir.path(), network.clone(), NetworkConfig::default());

        let artifact = enc.encrypt_file(&paths).await.unwrap();

        let mut expected = b"scrubbed image bytes".to_vec();
        expected.reverse();
        assert_eq!(std::fs::read(&paths.enc).unwrap(), expected);
        assert_eq!(
            std::fs::read_to_string(&paths.hash).unwrap(),
            artifact.data_to_encrypt_hash
        );
        assert_eq!(network.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_request_carries_policy_and_session_sigs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scrubbed_fixture(dir.path());
        let network = FakeNetwork::default();
        let enc = encryptor(dir.path(), network.clone(), NetworkConfig::default());
        enc.encrypt_file(&paths).await.unwrap();

        let request = network.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request["chain"], "sepolia");
        assert_eq!(
            request["evmContractConditions"][0]["functionName"],
            "verifyProof"
        );
        let sigs = request["sessionSigs"].as_object().unwrap();
        assert_eq!(sigs.len(), 2);
        let signed: serde_json::Value =
            serde_json::from_str(sigs["https://node-1"]["signedMessage"].as_str().unwrap())
                .unwrap();
        let grant = signed["capabilities"][0]["signedMessage"].as_str().unwrap();
        assert!(grant.contains("Nonce: 0x5eed"));
    }

    #[tokio::test]
    async fn test_paid_tier_adds_capacity_delegation() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scrubbed_fixture(dir.path());
        let network = FakeNetwork::default();
        let settings = NetworkConfig {
            tier: NetworkTier::DatilTest,
            capacity_token_id: Some("77".to_string()),
            ..NetworkConfig::default()
        };
        let enc = encryptor(dir.path(), network.clone(), settings);
        enc.encrypt_file(&paths).await.unwrap();

        let request = network.last_request.lock().unwrap().clone().unwrap();
        let sig = request["sessionSigs"]["https://node-1"]["signedMessage"]
            .as_str()
            .unwrap()
            .to_string();
        let payload: serde_json::Value = serde_json::from_str(&sig).unwrap();
        let delegation = payload["capabilities"][0]["signedMessage"].as_str().unwrap();
        assert!(delegation.contains("lit-ratelimitincrease://77"));
    }

    #[tokio::test]
    async fn test_network_rejection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = scrubbed_fixture(dir.path());
        let network = FakeNetwork {
            reject_with: Some("condition chain not supported".to_string()),
            ..FakeNetwork::default()
        };
        let enc = encryptor(dir.path(), network, NetworkConfig::default());

        let err = enc.encrypt_file(&paths).await.unwrap_err();
        assert!(matches!(err, PipelineError::Encrypt { .. }));
        assert!(err.to_string().contains("condition chain not supported"));
        assert!(!paths.enc.exists());
        assert!(!paths.hash.exists());
    }
}
