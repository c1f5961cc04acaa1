//! The on-chain condition a decryptor must satisfy: a valid Semaphore proof of
//! group membership, checked by calling `verifyProof` on the verifier contract.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::PolicyConfig;

/// Proof parameters supplied by the decryptor, in the verifier's argument order.
pub const PROOF_PARAMS: [&str; 6] = [
    ":litParam:merkleTreeRoot",
    ":litParam:nullifierHash",
    ":litParam:signal",
    ":litParam:externalNullifier",
    ":litParam:proof",
    ":litParam:merkleTreeDepth",
];

/// Comparison applied to the contract call's return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValueTest {
    pub key: String,
    pub comparator: String,
    pub value: String,
}

/// An EVM contract call condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmContractCondition {
    pub contract_address: String,
    pub function_name: String,
    pub function_params: Vec<String>,
    pub function_abi: Value,
    pub chain: String,
    pub return_value_test: ReturnValueTest,
}

/// The immutable access policy shared by every file of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPolicy {
    conditions: Vec<EvmContractCondition>,
}

impl AccessPolicy {
    /// Group-membership policy for the configured verifier contract.
    ///
    /// `verifyProof` reverts on an invalid proof and returns nothing otherwise,
    /// so the return value test matches the empty value.
    pub fn group_membership(config: &PolicyConfig) -> Self {
        let condition = EvmContractCondition {
            contract_address: config.verifier_contract.clone(),
            function_name: "verifyProof".to_string(),
            function_params: PROOF_PARAMS.iter().map(|p| p.to_string()).collect(),
            function_abi: verify_proof_abi(),
            chain: config.chain.clone(),
            return_value_test: ReturnValueTest {
                key: String::new(),
                comparator: "=".to_string(),
                value: String::new(),
            },
        };
        Self {
            conditions: vec![condition],
        }
    }

    pub fn conditions(&self) -> &[EvmContractCondition] {
        &self.conditions
    }
}

/// ABI fragment of the Semaphore verifier's `verifyProof`.
pub fn verify_proof_abi() -> Value {
    let uint = |name: &str| {
        json!({ "internalType": "uint256", "name": name, "type": "uint256" })
    };
    json!({
        "inputs": [
            uint("merkleTreeRoot"),
            uint("nullifierHash"),
            uint("signal"),
            uint("externalNullifier"),
            { "internalType": "uint256[8]", "name": "proof", "type": "uint256[8]" },
            uint("merkleTreeDepth"),
        ],
        "name": "verifyProof",
        "outputs": [],
        "stateMutability": "view",
        "type": "function",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_targets_verifier() {
        let policy = AccessPolicy::group_membership(&PolicyConfig::default());
        let [condition] = policy.conditions() else {
            panic!("expected exactly one condition");
        };
        assert_eq!(
            condition.contract_address,
            "0xb908Bcb798e5353fB90155C692BddE3b4937217C"
        );
        assert_eq!(condition.function_name, "verifyProof");
        assert_eq!(condition.chain, "sepolia");
    }

    #[test]
    fn test_params_follow_abi_order() {
        let policy = AccessPolicy::group_membership(&PolicyConfig::default());
        let condition = &policy.conditions()[0];
        let abi_names: Vec<String> = condition.function_abi["inputs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|input| format!(":litParam:{}", input["name"].as_str().unwrap()))
            .collect();
        assert_eq!(condition.function_params, abi_names);
    }

    #[test]
    fn test_condition_serializes_camel_case() {
        let policy = AccessPolicy::group_membership(&PolicyConfig::default());
        let value = serde_json::to_value(&policy.conditions()[0]).unwrap();
        assert!(value.get("contractAddress").is_some());
        assert!(value.get("functionParams").is_some());
        assert_eq!(value["returnValueTest"]["comparator"], "=");
        assert_eq!(value["functionAbi"]["inputs"][4]["type"], "uint256[8]");
    }
}
