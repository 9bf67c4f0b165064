//! Policy primitives for ICN cooperative records
//!
//! Both the treasury and the governance workflows check one proposed
//! transition of a singleton record at a time: a structural diff of the old
//! record against the candidate successor, plus threshold and quorum
//! arithmetic. This crate holds those shared pieces and the validation
//! boundary they run behind.

pub mod context;
pub mod diff;
pub mod entry;
pub mod rejection;
pub mod threshold;

pub use context::ValidationContext;
pub use diff::{value_of, verify_transition, FieldPolicy, FieldRule, Predicate};
pub use entry::{decode_single_successor, validate, Workflow};
pub use rejection::{DiffViolation, RejectCategory, ValidationError, ValidationResult, Verdict};
pub use threshold::{approvals_sufficient, evaluate, evaluate_with, QuorumBasis, TallyOutcome, VoteTally};
