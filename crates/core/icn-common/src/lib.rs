//! Common utilities and types for the Intercooperative Network

pub mod config;
pub mod error;
pub mod interfaces;
pub mod logging;
pub mod result;
pub mod types;

pub use config::{Configuration, ParamsAuthorization, QuorumMode, ValidatorConfig, VoteDeadlineMode};
pub use error::Error;
pub use interfaces::{AcceptAllOutputs, ExecutionOutputVerifier, MembershipRegistry, StaticMembership};
pub use result::Result;
pub use types::{Identity, Payload, RecordRef, SignerSet};
