//! Threshold-encryption network integration.
//!
//! The network is reached through the [`ThresholdNetwork`] trait so the
//! pipeline can run against the HTTP gateway in production and against an
//! in-process double in tests. Session signing happens locally
//! ([`session`]); only the handshake, block hash and encryption cross the wire.

pub mod encryptor;
pub mod gateway;
pub mod session;

pub use encryptor::{check_capacity, EncryptedArtifact, Encryptor};
pub use gateway::GatewayClient;
pub use session::{SessionKey, SessionSig, SessionSigs};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::access::EvmContractCondition;
use crate::error::PipelineResult;

/// Result of connecting to the network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Handshake {
    /// Node URLs that each need a session signature
    pub nodes: Vec<String>,
}

/// Payload sent to the network for encryption.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    /// Base64 plaintext
    pub data_to_encrypt: String,
    pub chain: String,
    pub evm_contract_conditions: Vec<EvmContractCondition>,
    pub session_sigs: SessionSigs,
}

/// Ciphertext and the hash the network needs to authorize later decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResponse {
    /// Base64 ciphertext
    pub ciphertext: String,
    pub data_to_encrypt_hash: String,
}

/// Trait every threshold-network client implements.
///
/// Uses `async_trait` because the pipeline holds a `Box<dyn ThresholdNetwork>`.
#[async_trait]
pub trait ThresholdNetwork: Send + Sync {
    /// Client name for logging.
    fn name(&self) -> &str;

    /// Connect and discover the node set.
    async fn connect(&self) -> PipelineResult<Handshake>;

    /// Latest block hash, used as the nonce of signed statements.
    async fn latest_blockhash(&self) -> PipelineResult<String>;

    /// Encrypt under the request's access conditions.
    async fn encrypt(&self, request: &EncryptRequest) -> PipelineResult<EncryptResponse>;
}
