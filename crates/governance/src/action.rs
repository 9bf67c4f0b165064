//! Governance actions

use serde::{Deserialize, Serialize};

use icn_common::Payload;

use crate::{GovernanceParams, ProposalCategory, VoteChoice};

/// The closed set of governance transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GovernanceAction {
    /// Open a new proposal; bootstraps the record when there is none
    CreateProposal {
        title: String,
        description: String,
        category: ProposalCategory,
        voting_deadline: u64,
        #[serde(default)]
        execution_payload: Payload,
    },
    /// Record the signer's vote on an active proposal
    CastVote { proposal_id: u64, vote: VoteChoice },
    /// Mark an approved or passing proposal as executed
    ExecuteProposal { proposal_id: u64 },
    /// Withdraw an active proposal; proposer only
    CancelProposal { proposal_id: u64 },
    /// Replace the governance parameters
    UpdateParams { new_params: GovernanceParams },
}

impl GovernanceAction {
    pub fn name(&self) -> &'static str {
        match self {
            GovernanceAction::CreateProposal { .. } => "CreateProposal",
            GovernanceAction::CastVote { .. } => "CastVote",
            GovernanceAction::ExecuteProposal { .. } => "ExecuteProposal",
            GovernanceAction::CancelProposal { .. } => "CancelProposal",
            GovernanceAction::UpdateParams { .. } => "UpdateParams",
        }
    }
}
