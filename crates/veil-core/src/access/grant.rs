//! Capability grants: signed statements that authorize a session key to act
//! on the operator's behalf.
//!
//! The threshold network asks for a grant with a resource URI, an expiration
//! and a set of abilities; the grantor answers synchronously with an EIP-4361
//! (Sign-In with Ethereum) message carrying a ReCap resource, signed by the
//! operator wallet.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GrantError;
use crate::identity::OperatorWallet;

/// Ability to decrypt content gated by an access control condition.
pub const ABILITY_DECRYPTION: &str = "access-control-condition-decryption";

/// Ability to spend capacity credits on behalf of a delegator.
pub const ABILITY_RATE_LIMIT: &str = "rate-limit-increase-auth";

/// Wildcard resource covering every access control condition.
pub const ANY_CONDITION_RESOURCE: &str = "lit-accesscontrolcondition://*";

/// A resource paired with the ability requested on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAbilityRequest {
    pub resource: String,
    pub ability: String,
}

impl ResourceAbilityRequest {
    /// Decryption rights over any access-controlled content.
    pub fn decrypt_any() -> Self {
        Self {
            resource: ANY_CONDITION_RESOURCE.to_string(),
            ability: ABILITY_DECRYPTION.to_string(),
        }
    }

    /// ReCap namespace/ability pair for this request.
    fn recap_ability(&self) -> String {
        match self.ability.as_str() {
            ABILITY_DECRYPTION => "Threshold/Decryption".to_string(),
            ABILITY_RATE_LIMIT => "Auth/Auth".to_string(),
            "access-control-condition-signing" | "pkp-signing" => "Threshold/Signing".to_string(),
            "lit-action-execution" => "Threshold/Execution".to_string(),
            other => format!("Threshold/{other}"),
        }
    }
}

/// What the network asks to have signed. Fields are optional because the
/// request arrives from the other side of a callback boundary.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRequest {
    pub uri: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub resource_ability_requests: Option<Vec<ResourceAbilityRequest>>,
}

/// A signed statement, in the shape the threshold network consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
}

/// Produces capability grants on demand.
pub trait CapabilityGrantor {
    fn obtain_capability_grant(&self, request: &CapabilityRequest) -> Result<AuthSig, GrantError>;
}

/// A ReCap (EIP-5573) capability object.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recap {
    att: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
    prf: Vec<String>,
}

impl Recap {
    /// Grant `request` with the given caveats (`nb`).
    pub fn grant(mut self, request: &ResourceAbilityRequest, caveats: Value) -> Self {
        self.att
            .entry(request.resource.clone())
            .or_default()
            .entry(request.recap_ability())
            .or_default()
            .push(caveats);
        self
    }

    /// `urn:recap:` URI with the unpadded base64url JSON encoding.
    pub fn to_urn(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!(
            "urn:recap:{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
        )
    }

    /// Human-readable statement required by ReCap for every granted ability.
    pub fn statement(&self) -> String {
        let mut out =
            String::from("I further authorize the stated URI to perform the following actions on my behalf:");
        let mut n = 1;
        for (resource, abilities) in &self.att {
            for ability in abilities.keys() {
                let (namespace, name) = ability.split_once('/').unwrap_or(("", ability));
                out.push_str(&format!(" ({n}) '{namespace}': '{name}' for '{resource}'."));
                n += 1;
            }
        }
        out
    }
}

/// An EIP-4361 message.
#[derive(Debug, Clone)]
pub struct SiweMessage {
    pub domain: String,
    pub address: String,
    pub statement: String,
    pub uri: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub resources: Vec<String>,
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} wants you to sign in with your Ethereum account:",
            self.domain
        )?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        writeln!(f, "{}", self.statement)?;
        writeln!(f)?;
        writeln!(f, "URI: {}", self.uri)?;
        writeln!(f, "Version: 1")?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        writeln!(f, "Issued At: {}", rfc3339(&self.issued_at))?;
        write!(f, "Expiration Time: {}", rfc3339(&self.expiration))?;
        if !self.resources.is_empty() {
            write!(f, "\nResources:")?;
            for resource in &self.resources {
                write!(f, "\n- {resource}")?;
            }
        }
        Ok(())
    }
}

pub(crate) fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Answers capability requests by signing with the operator wallet.
pub struct WalletGrantor<'a> {
    wallet: &'a OperatorWallet,
    nonce: String,
    domain: String,
    chain_id: u64,
}

impl<'a> WalletGrantor<'a> {
    /// `nonce` must be a fresh block hash from the network.
    pub fn new(wallet: &'a OperatorWallet, nonce: &str, domain: &str, chain_id: u64) -> Self {
        Self {
            wallet,
            nonce: nonce.to_string(),
            domain: domain.to_string(),
            chain_id,
        }
    }

    /// Authorize the operator's own address to spend `uses` of capacity token `token_id`.
    pub fn capacity_delegation(
        &self,
        token_id: &str,
        uses: u32,
        expiration: DateTime<Utc>,
    ) -> Result<AuthSig, GrantError> {
        let delegatee = hex::encode(self.wallet.address().as_slice());
        let request = ResourceAbilityRequest {
            resource: format!("lit-ratelimitincrease://{token_id}"),
            ability: ABILITY_RATE_LIMIT.to_string(),
        };
        let caveats = json!({
            "nft_id": [token_id],
            "uses": uses.to_string(),
            "delegate_to": [delegatee],
        });
        let recap = Recap::default().grant(&request, caveats);
        self.sign(&recap, "lit:capability:delegation", expiration)
    }

    fn sign(
        &self,
        recap: &Recap,
        uri: &str,
        expiration: DateTime<Utc>,
    ) -> Result<AuthSig, GrantError> {
        let address = self.wallet.address().to_checksum(None);
        let message = SiweMessage {
            domain: self.domain.clone(),
            address: address.clone(),
            statement: recap.statement(),
            uri: uri.to_string(),
            chain_id: self.chain_id,
            nonce: self.nonce.clone(),
            issued_at: Utc::now(),
            expiration,
            resources: vec![recap.to_urn()],
        }
        .to_string();

        let sig = self
            .wallet
            .sign_message(&message)
            .map_err(|e| GrantError::Signing(e.to_string()))?;

        Ok(AuthSig {
            sig,
            derived_via: "web3.eth.personal.sign".to_string(),
            signed_message: message,
            address,
        })
    }
}

impl CapabilityGrantor for WalletGrantor<'_> {
    fn obtain_capability_grant(&self, request: &CapabilityRequest) -> Result<AuthSig, GrantError> {
        let uri = request
            .uri
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(GrantError::MissingField("uri"))?;
        let expiration = request
            .expiration
            .ok_or(GrantError::MissingField("expiration"))?;
        let abilities = request
            .resource_ability_requests
            .as_ref()
            .filter(|r| !r.is_empty())
            .ok_or(GrantError::MissingField("resourceAbilityRequests"))?;

        let recap = abilities
            .iter()
            .fold(Recap::default(), |recap, r| recap.grant(r, json!({})));
        self.sign(&recap, uri, expiration)
    }
}
