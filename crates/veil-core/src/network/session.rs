//! Session signatures.
//!
//! A fresh Ed25519 session key is generated per encryption. The operator
//! wallet grants it capabilities once (through the [`CapabilityGrantor`]
//! callback), then the session key signs one payload per network node.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::access::grant::rfc3339;
use crate::access::{AuthSig, CapabilityGrantor, CapabilityRequest, ResourceAbilityRequest};
use crate::error::{PipelineError, PipelineResult};

/// A node-specific signature made with the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSig {
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
    pub algo: String,
}

/// Session signatures keyed by node URL.
pub type SessionSigs = BTreeMap<String, SessionSig>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload<'a> {
    session_key: &'a str,
    resource_ability_requests: &'a [ResourceAbilityRequest],
    capabilities: &'a [AuthSig],
    issued_at: String,
    expiration: String,
    node_address: &'a str,
}

/// An ephemeral Ed25519 key that lives for one encryption.
pub struct SessionKey {
    signing_key: SigningKey,
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::generate()
    }
}

impl SessionKey {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Hex-encoded public key.
    pub fn public_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// URI the operator's grant is bound to.
    pub fn uri(&self) -> String {
        format!("lit:session:{}", self.public_hex())
    }

    /// Obtain the operator's grant and sign a session payload for each node.
    ///
    /// `capacity` is prepended to the capabilities when the tier is paid.
    pub fn sign_for_nodes(
        &self,
        nodes: &[String],
        abilities: &[ResourceAbilityRequest],
        expiration: DateTime<Utc>,
        capacity: Option<AuthSig>,
        grantor: &dyn CapabilityGrantor,
    ) -> PipelineResult<SessionSigs> {
        if nodes.is_empty() {
            return Err(PipelineError::Remote {
                service: "threshold network".to_string(),
                message: "handshake returned no nodes".to_string(),
                status_code: None,
            });
        }

        let grant = grantor.obtain_capability_grant(&CapabilityRequest {
            uri: Some(self.uri()),
            expiration: Some(expiration),
            resource_ability_requests: Some(abilities.to_vec()),
        })?;

        let capabilities: Vec<AuthSig> = capacity.into_iter().chain(Some(grant)).collect();
        let session_key = self.public_hex();
        let issued_at = rfc3339(&Utc::now());
        let expiration = rfc3339(&expiration);

        let mut sigs = SessionSigs::new();
        for node in nodes {
            let payload = SessionPayload {
                session_key: &session_key,
                resource_ability_requests: abilities,
                capabilities: &capabilities,
                issued_at: issued_at.clone(),
                expiration: expiration.clone(),
                node_address: node,
            };
            let signed_message =
                serde_json::to_string(&payload).map_err(|e| PipelineError::Remote {
                    service: "session signer".to_string(),
                    message: e.to_string(),
                    status_code: None,
                })?;
            let sig = self.signing_key.sign(signed_message.as_bytes());
            sigs.insert(
                node.clone(),
                SessionSig {
                    sig: hex::encode(sig.to_bytes()),
                    derived_via: "litSessionSignViaNacl".to_string(),
                    signed_message,
                    address: session_key.clone(),
                    algo: "ed25519".to_string(),
                },
            );
        }
        tracing::trace!("Signed session for {} node(s)", sigs.len());
        Ok(sigs)
    }
}
