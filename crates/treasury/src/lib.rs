//! Multi-signature treasury workflow for ICN cooperatives
//!
//! Members contribute funds directly. Outgoing transactions are proposed,
//! collect approvals from distinct members, and are executed once the
//! required count for their type is reached, or cancelled by their proposer.
//! This crate validates each of those transitions of the treasury record.

pub mod action;
pub mod builder;
pub mod types;
pub mod validator;

pub use action::TreasuryAction;
pub use builder::{build_successor, Genesis};
pub use types::{PendingTransaction, TransactionRecord, TransactionType, TreasuryRecord};
pub use validator::TreasuryValidator;
