//! Access control: who may decrypt, and how the operator authorizes sessions.
//!
//! - **policy**: the group-membership condition checked on chain
//! - **grant**: signed capability statements produced for the network

pub mod grant;
pub mod policy;

pub use grant::{
    AuthSig, CapabilityGrantor, CapabilityRequest, ResourceAbilityRequest, WalletGrantor,
};
pub use policy::{AccessPolicy, EvmContractCondition};
