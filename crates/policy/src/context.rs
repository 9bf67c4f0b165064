//! Per-call validation context

use icn_common::{Identity, Payload, SignerSet};

use crate::rejection::{ValidationError, ValidationResult};

/// Everything a validation call may consult besides the records themselves.
///
/// `reference_time` comes from the submitted transition's declared validity
/// window; validators never read a clock.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Identities that endorsed the transition
    pub signers: SignerSet,
    /// Caller-supplied time bound, in the same unit as the records' timestamps
    pub reference_time: u64,
    /// Other outputs the transition produces besides the successor record
    pub produced_outputs: Vec<Payload>,
}

impl ValidationContext {
    pub fn new(signers: SignerSet, reference_time: u64) -> Self {
        Self {
            signers,
            reference_time,
            produced_outputs: Vec::new(),
        }
    }

    pub fn with_outputs(mut self, produced_outputs: Vec<Payload>) -> Self {
        self.produced_outputs = produced_outputs;
        self
    }

    /// The acting signer, or an authorization failure when nobody signed
    pub fn require_signer(&self) -> ValidationResult<&Identity> {
        self.signers
            .primary()
            .ok_or_else(|| ValidationError::authorization("transition has no authorizing identity"))
    }

    pub fn is_signed_by(&self, identity: &Identity) -> bool {
        self.signers.contains(identity)
    }
}
