//! Collaborator interfaces consumed by the validators
//!
//! The membership registry and the surrounding transaction environment are
//! external to the treasury and governance workflows. The validators only see
//! them through these traits.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Identity, Payload};

/// Authorization lookups against the membership registry
pub trait MembershipRegistry {
    /// Whether the identity is a registry administrator
    fn is_admin(&self, identity: &Identity) -> bool;

    /// Number of registered members, used as the electorate size
    fn member_count(&self) -> u64;
}

/// Legitimacy of the outputs a treasury execution produces.
///
/// `tx_type` is the transaction type's name, `record` the executed
/// transaction record encoded as a payload.
pub trait ExecutionOutputVerifier {
    fn verify_execution_outputs(&self, tx_type: &str, record: &Payload, produced_outputs: &[Payload]) -> bool;
}

/// Accepts every execution; fund movement is checked by the surrounding environment
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllOutputs;

impl ExecutionOutputVerifier for AcceptAllOutputs {
    fn verify_execution_outputs(&self, _tx_type: &str, _record: &Payload, _produced_outputs: &[Payload]) -> bool {
        true
    }
}

/// A registry snapshot held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMembership {
    #[serde(default)]
    pub members: BTreeSet<Identity>,
    #[serde(default)]
    pub admins: BTreeSet<Identity>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member
    pub fn with_member(mut self, identity: impl Into<Identity>) -> Self {
        self.members.insert(identity.into());
        self
    }

    /// Register an admin; admins are members too
    pub fn with_admin(mut self, identity: impl Into<Identity>) -> Self {
        let identity = identity.into();
        self.members.insert(identity.clone());
        self.admins.insert(identity);
        self
    }
}

impl MembershipRegistry for StaticMembership {
    fn is_admin(&self, identity: &Identity) -> bool {
        self.admins.contains(identity)
    }

    fn member_count(&self) -> u64 {
        self.members.len() as u64
    }
}
