//! Intercooperative Network (ICN) cooperative policy
//!
//! Validation of the records a cooperative keeps on a shared ledger: the
//! multi-signature treasury and the proposal and voting process that governs
//! it. Each transition of a record is checked in isolation against the
//! action that produced it.

/// Module version information
pub mod version {
    /// The current version of the ICN library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Re-export core components for easy access
pub mod core {
    pub use icn_common as common;
    pub use icn_policy as policy;
}

/// Re-export the record workflows
pub mod workflows {
    pub use icn_governance as governance;
    pub use icn_treasury as treasury;
}

pub use icn_common::{Identity, Payload, RecordRef, SignerSet, ValidatorConfig};
pub use icn_policy::{validate, ValidationContext, ValidationError, Verdict, Workflow};
