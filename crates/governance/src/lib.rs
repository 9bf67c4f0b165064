//! Governance module for ICN
//!
//! This module validates the governance workflow of a cooperative: proposal
//! creation, voting, execution, cancellation, and replacement of the
//! governance parameters. Each transition of the singleton governance record
//! is checked against the action that produced it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use icn_common::{Identity, Payload, RecordRef};
use icn_policy::VoteTally;

pub mod action;
pub mod builder;
pub mod execution;
pub mod validator;
pub mod voting;

pub use action::GovernanceAction;
pub use builder::{build_successor, GovernanceGenesis};
pub use execution::{CategoryExecutor, ProposalExecutor};
pub use validator::GovernanceValidator;
pub use voting::{ElectorateQuorum, VoteCountQuorum, VotingResult, VotingScheme};

/// Field names as they appear in serialized governance records
pub mod fields {
    pub const PARAMS: &str = "params";
    pub const PROPOSALS: &str = "proposals";
    pub const NEXT_PROPOSAL_ID: &str = "next_proposal_id";
    pub const STATUS: &str = "status";
    pub const VOTES: &str = "votes";
    pub const FOR_VOTES: &str = "for_votes";
    pub const AGAINST_VOTES: &str = "against_votes";
    pub const ABSTAIN_VOTES: &str = "abstain_votes";
}

/// Status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Open for voting
    Active,
    /// Proposal has been approved
    Approved,
    /// Proposal has been rejected
    Rejected,
    /// Proposal has been executed
    Executed,
    /// Proposal has been cancelled
    Cancelled,
}

impl Default for ProposalStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Categories of proposals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalCategory {
    /// Spending or lending from the treasury
    TreasuryAction,
    /// Change of governance parameters
    ParameterChange,
    /// Admission or removal of members
    MembershipChange,
    /// Anything else
    Other,
}

/// A member's choice on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

impl VoteChoice {
    /// The tally field this choice increments
    pub fn tally_field(&self) -> &'static str {
        match self {
            VoteChoice::For => fields::FOR_VOTES,
            VoteChoice::Against => fields::AGAINST_VOTES,
            VoteChoice::Abstain => fields::ABSTAIN_VOTES,
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A proposal for governance decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// The title of the proposal
    pub title: String,
    /// The detailed description of the proposal
    pub description: String,
    /// The category of proposal
    pub category: ProposalCategory,
    /// The identity that submitted the proposal
    pub proposer: Identity,
    /// When the proposal was created
    pub creation_time: u64,
    /// When voting closes
    pub voting_deadline: u64,
    /// The current status of the proposal
    pub status: ProposalStatus,
    /// What executing the proposal does; opaque to governance
    #[serde(default)]
    pub execution_payload: Payload,
    /// One vote per identity
    pub votes: BTreeMap<Identity, VoteChoice>,
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
}

impl Proposal {
    /// Create a new active proposal with no votes
    pub fn new(
        title: String,
        description: String,
        category: ProposalCategory,
        proposer: Identity,
        creation_time: u64,
        voting_deadline: u64,
        execution_payload: Payload,
    ) -> Self {
        Self {
            title,
            description,
            category,
            proposer,
            creation_time,
            voting_deadline,
            status: ProposalStatus::Active,
            execution_payload,
            votes: BTreeMap::new(),
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
        }
    }

    /// The stored counters
    pub fn tally(&self) -> VoteTally {
        VoteTally::new(self.for_votes, self.against_votes, self.abstain_votes)
    }

    /// The counters recomputed from the votes map
    pub fn recount(&self) -> VoteTally {
        self.votes.values().fold(VoteTally::default(), |mut tally, choice| {
            match choice {
                VoteChoice::For => tally.for_votes += 1,
                VoteChoice::Against => tally.against_votes += 1,
                VoteChoice::Abstain => tally.abstain_votes += 1,
            }
            tally
        })
    }

    pub fn has_voted(&self, identity: &Identity) -> bool {
        self.votes.contains_key(identity)
    }

    /// Record a vote and bump the matching counter
    pub fn record_vote(&mut self, voter: Identity, choice: VoteChoice) {
        self.votes.insert(voter, choice);
        match choice {
            VoteChoice::For => self.for_votes += 1,
            VoteChoice::Against => self.against_votes += 1,
            VoteChoice::Abstain => self.abstain_votes += 1,
        }
    }
}

/// Governance parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Percentage of for-votes among votes cast needed to pass, in (50, 100]
    pub approval_threshold: u64,
    /// Minimum time between creation and the voting deadline
    pub minimum_voting_period: u64,
    /// Quorum percentage, in (0, 100]
    pub quorum_percentage: u64,
}

impl GovernanceParams {
    /// Check every parameter is within its allowed range
    pub fn validate(&self) -> Result<(), String> {
        if self.approval_threshold <= 50 || self.approval_threshold > 100 {
            return Err(format!(
                "approval threshold {} must be above 50 and at most 100",
                self.approval_threshold
            ));
        }

        if self.minimum_voting_period == 0 {
            return Err("minimum voting period must be positive".to_string());
        }

        if self.quorum_percentage == 0 || self.quorum_percentage > 100 {
            return Err(format!(
                "quorum percentage {} must be above 0 and at most 100",
                self.quorum_percentage
            ));
        }

        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            approval_threshold: 60,
            minimum_voting_period: 86_400,
            quorum_percentage: 25,
        }
    }
}

/// The governance record of a cooperative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceRecord {
    /// Handle to the membership record
    pub entity: RecordRef,
    /// Handle to the treasury record
    pub treasury: RecordRef,
    pub params: GovernanceParams,
    /// Append-only; a proposal's index is its id
    pub proposals: Vec<Proposal>,
    /// Number of proposals created so far
    pub next_proposal_id: u64,
}

impl GovernanceRecord {
    pub fn proposal(&self, proposal_id: u64) -> Option<&Proposal> {
        usize::try_from(proposal_id).ok().and_then(|index| self.proposals.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal::new(
            "Buy a kiln".into(),
            "Shared kiln for the pottery studio".into(),
            ProposalCategory::TreasuryAction,
            Identity::new("alice"),
            100,
            200,
            Payload::default(),
        )
    }

    #[test]
    fn test_new_proposal_is_active_and_empty() {
        let proposal = proposal();
        assert_eq!(proposal.status, ProposalStatus::Active);
        assert!(proposal.votes.is_empty());
        assert_eq!(proposal.tally(), VoteTally::default());
    }

    #[test]
    fn test_record_vote_keeps_counters_consistent() {
        let mut proposal = proposal();
        proposal.record_vote(Identity::new("alice"), VoteChoice::For);
        proposal.record_vote(Identity::new("bob"), VoteChoice::Against);
        proposal.record_vote(Identity::new("carol"), VoteChoice::For);

        assert_eq!(proposal.tally(), VoteTally::new(2, 1, 0));
        assert_eq!(proposal.recount(), proposal.tally());
        assert!(proposal.has_voted(&Identity::new("bob")));
    }

    #[test]
    fn test_params_ranges() {
        assert!(GovernanceParams::default().validate().is_ok());

        let at_fifty = GovernanceParams { approval_threshold: 50, ..GovernanceParams::default() };
        assert!(at_fifty.validate().is_err());

        let over = GovernanceParams { approval_threshold: 101, ..GovernanceParams::default() };
        assert!(over.validate().is_err());

        let no_period = GovernanceParams { minimum_voting_period: 0, ..GovernanceParams::default() };
        assert!(no_period.validate().is_err());

        let no_quorum = GovernanceParams { quorum_percentage: 0, ..GovernanceParams::default() };
        assert!(no_quorum.validate().is_err());

        let full = GovernanceParams { approval_threshold: 100, quorum_percentage: 100, minimum_voting_period: 1 };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_votes_serialize_as_map() {
        let mut proposal = proposal();
        proposal.record_vote(Identity::new("bob"), VoteChoice::Abstain);
        let value = serde_json::to_value(&proposal).unwrap();
        assert_eq!(value[fields::VOTES]["bob"], "Abstain");
    }
}
