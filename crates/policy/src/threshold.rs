//! Threshold and quorum arithmetic
//!
//! Percentages are whole numbers (`60` means 60%). Division truncates.

use serde::{Deserialize, Serialize};

/// Vote counts of one proposal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
}

impl VoteTally {
    pub fn new(for_votes: u64, against_votes: u64, abstain_votes: u64) -> Self {
        Self {
            for_votes,
            against_votes,
            abstain_votes,
        }
    }

    /// Total votes cast, abstentions included
    pub fn total(&self) -> u128 {
        self.for_votes as u128 + self.against_votes as u128 + self.abstain_votes as u128
    }
}

/// What participation is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumBasis {
    /// Vote count compared directly with the percentage constant
    VoteCount,
    /// Vote count as a share of this many eligible voters
    Electorate(u64),
}

/// Result of evaluating a tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyOutcome {
    /// Whether enough votes were cast
    pub quorum_met: bool,
    /// Whether the for-share of all votes reaches the approval threshold
    pub approved: bool,
}

impl TallyOutcome {
    /// Both quorum and approval hold
    pub fn passes(&self) -> bool {
        self.quorum_met && self.approved
    }
}

/// Evaluate a tally with the vote-count quorum basis.
///
/// `quorum_met = total * 100 >= quorum_pct`;
/// `approved = total > 0 && for * 100 / total >= approval_threshold_pct`.
pub fn evaluate(tally: VoteTally, approval_threshold_pct: u64, quorum_pct: u64) -> TallyOutcome {
    evaluate_with(tally, approval_threshold_pct, quorum_pct, QuorumBasis::VoteCount)
}

/// Evaluate a tally against an explicit quorum basis
pub fn evaluate_with(
    tally: VoteTally,
    approval_threshold_pct: u64,
    quorum_pct: u64,
    basis: QuorumBasis,
) -> TallyOutcome {
    let total = tally.total();

    let quorum_met = match basis {
        QuorumBasis::VoteCount => total * 100 >= quorum_pct as u128,
        // An empty electorate can never be quorate.
        QuorumBasis::Electorate(0) => false,
        QuorumBasis::Electorate(eligible) => total * 100 >= quorum_pct as u128 * eligible as u128,
    };

    let approved = total > 0 && (tally.for_votes as u128 * 100) / total >= approval_threshold_pct as u128;

    TallyOutcome { quorum_met, approved }
}

/// Whether a pending treasury transaction has collected enough approvals
pub fn approvals_sufficient(approvals: usize, required_approvals: u32) -> bool {
    approvals as u128 >= required_approvals as u128
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clear_approval() {
        let outcome = evaluate(VoteTally::new(3, 1, 0), 60, 25);
        assert!(outcome.quorum_met);
        assert!(outcome.approved);
        assert!(outcome.passes());
    }

    #[test]
    fn test_split_vote_below_threshold() {
        let outcome = evaluate(VoteTally::new(1, 1, 0), 60, 25);
        assert!(outcome.quorum_met);
        assert!(!outcome.approved);
    }

    #[test]
    fn test_no_votes() {
        let outcome = evaluate(VoteTally::default(), 51, 1);
        assert!(!outcome.quorum_met);
        assert!(!outcome.approved);
    }

    #[test]
    fn test_truncating_division() {
        // 2 * 100 / 3 = 66, which misses a 67% threshold
        assert!(!evaluate(VoteTally::new(2, 1, 0), 67, 10).approved);
        assert!(evaluate(VoteTally::new(2, 1, 0), 66, 10).approved);
    }

    #[test]
    fn test_abstentions_dilute_approval() {
        let outcome = evaluate(VoteTally::new(3, 0, 2), 61, 10);
        assert!(!outcome.approved);
    }

    #[test]
    fn test_electorate_quorum() {
        let tally = VoteTally::new(3, 1, 0);
        assert!(!evaluate_with(tally, 60, 25, QuorumBasis::Electorate(20)).quorum_met);
        assert!(evaluate_with(tally, 60, 25, QuorumBasis::Electorate(16)).quorum_met);
        assert!(!evaluate_with(tally, 60, 25, QuorumBasis::Electorate(0)).quorum_met);
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let outcome = evaluate(VoteTally::new(u64::MAX, u64::MAX, 0), 50, 100);
        assert!(outcome.quorum_met);
        assert!(outcome.approved);
    }

    #[test]
    fn test_approvals_sufficient() {
        assert!(approvals_sufficient(2, 2));
        assert!(approvals_sufficient(3, 2));
        assert!(!approvals_sufficient(1, 2));
        assert!(approvals_sufficient(0, 0));
    }

    proptest! {
        #[test]
        fn prop_literal_quorum_holds_once_anyone_votes(
            for_votes in 0u64..1000,
            against in 0u64..1000,
            abstain in 0u64..1000,
            quorum in 1u64..=100,
        ) {
            let tally = VoteTally::new(for_votes, against, abstain);
            let outcome = evaluate(tally, 51, quorum);
            prop_assert_eq!(outcome.quorum_met, tally.total() > 0);
        }

        #[test]
        fn prop_unanimous_for_always_approves(for_votes in 1u64..10_000, threshold in 51u64..=100) {
            prop_assert!(evaluate(VoteTally::new(for_votes, 0, 0), threshold, 100).approved);
        }
    }
}
