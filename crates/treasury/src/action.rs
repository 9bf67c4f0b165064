//! Treasury actions

use serde::{Deserialize, Serialize};

use crate::types::TransactionRecord;

/// The closed set of treasury transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TreasuryAction {
    /// Pay funds in; bootstraps the treasury when there is no record yet
    Contribute { amount: u64, description: String },
    /// Propose an outgoing transaction for approval
    ProposeTransaction { transaction: TransactionRecord },
    /// Add the signer's approval to a pending transaction.
    ///
    /// The approver is the primary signer, the lowest identity in the signer
    /// set. If that identity already approved, the transition is rejected even
    /// when another signer has not.
    ApproveTransaction { index: usize },
    /// Move a sufficiently approved pending transaction into the history
    ExecuteTransaction { index: usize },
    /// Withdraw a pending transaction; proposer only
    CancelTransaction { index: usize },
}

impl TreasuryAction {
    pub fn name(&self) -> &'static str {
        match self {
            TreasuryAction::Contribute { .. } => "Contribute",
            TreasuryAction::ProposeTransaction { .. } => "ProposeTransaction",
            TreasuryAction::ApproveTransaction { .. } => "ApproveTransaction",
            TreasuryAction::ExecuteTransaction { .. } => "ExecuteTransaction",
            TreasuryAction::CancelTransaction { .. } => "CancelTransaction",
        }
    }
}
