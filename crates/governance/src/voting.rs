//! Voting schemes for governance
//!
//! A scheme turns a proposal's tally and the record's parameters into a
//! decision. The schemes differ only in what the quorum percentage is
//! measured against.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use icn_policy::{evaluate_with, QuorumBasis, VoteTally};

use crate::GovernanceParams;

/// Result of a vote tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingResult {
    /// Whether the for-share reaches the approval threshold
    pub approved: bool,
    /// Whether the vote reached quorum
    pub has_quorum: bool,
    /// The counts that were evaluated
    pub tally: VoteTally,
    /// Approval percentage required
    pub approval_threshold: u64,
    /// Quorum percentage required
    pub quorum_percentage: u64,
}

impl VotingResult {
    /// Whether the proposal may be executed on this tally
    pub fn passes(&self) -> bool {
        self.approved && self.has_quorum
    }
}

/// A trait for different voting schemes
pub trait VotingScheme: Send + Sync + Debug {
    /// Tally votes and determine the result
    fn tally_votes(&self, tally: VoteTally, params: &GovernanceParams) -> VotingResult;
}

fn result_for(tally: VoteTally, params: &GovernanceParams, basis: QuorumBasis) -> VotingResult {
    let outcome = evaluate_with(tally, params.approval_threshold, params.quorum_percentage, basis);
    VotingResult {
        approved: outcome.approved,
        has_quorum: outcome.quorum_met,
        tally,
        approval_threshold: params.approval_threshold,
        quorum_percentage: params.quorum_percentage,
    }
}

/// Quorum compares the raw vote count with the percentage constant
/// (`total * 100 >= quorum_percentage`), so any single vote is quorate.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteCountQuorum;

impl VotingScheme for VoteCountQuorum {
    fn tally_votes(&self, tally: VoteTally, params: &GovernanceParams) -> VotingResult {
        result_for(tally, params, QuorumBasis::VoteCount)
    }
}

/// Quorum is a share of the registered electorate
#[derive(Debug, Clone, Copy)]
pub struct ElectorateQuorum {
    eligible_voters: u64,
}

impl ElectorateQuorum {
    pub fn new(eligible_voters: u64) -> Self {
        Self { eligible_voters }
    }
}

impl VotingScheme for ElectorateQuorum {
    fn tally_votes(&self, tally: VoteTally, params: &GovernanceParams) -> VotingResult {
        result_for(tally, params, QuorumBasis::Electorate(self.eligible_voters))
    }
}
