//! Tests for the governance workflow
//!
//! Proposals are created, voted on and executed through the validation
//! boundary, with successors submitted as encoded payloads.

use proptest::prelude::*;

use icn_common::{Payload, RecordRef, SignerSet, ValidatorConfig};
use icn_policy::{validate, RejectCategory, ValidationContext, Verdict};
use icn_governance::{
    build_successor, GovernanceAction, GovernanceGenesis, GovernanceParams, GovernanceRecord, GovernanceValidator,
    ProposalCategory, ProposalStatus, VoteChoice,
};

const NOW: u64 = 1_700_000_000;

fn validator() -> GovernanceValidator {
    GovernanceValidator::new(&ValidatorConfig::default())
}

fn ctx(signer: &str) -> ValidationContext {
    ValidationContext::new([signer].into_iter().collect::<SignerSet>(), NOW)
}

fn genesis(params: GovernanceParams) -> GovernanceGenesis {
    GovernanceGenesis {
        entity: RecordRef::new("membership#0"),
        treasury: RecordRef::new("treasury#0"),
        params,
    }
}

fn step(
    old: Option<&GovernanceRecord>,
    action: GovernanceAction,
    ctx: &ValidationContext,
) -> (Verdict, GovernanceRecord) {
    let new = build_successor(old, Some(&genesis(GovernanceParams::default())), &action, ctx)
        .expect("successor should build");
    let successors = vec![Payload::encode(&new).unwrap()];
    (validate(&validator(), old, &action, ctx, &successors), new)
}

fn accepted(old: Option<&GovernanceRecord>, action: GovernanceAction, ctx: &ValidationContext) -> GovernanceRecord {
    let (verdict, new) = step(old, action, ctx);
    assert!(verdict.is_accepted(), "expected accept, got {}", verdict);
    new
}

fn open_proposal() -> GovernanceRecord {
    accepted(
        None,
        GovernanceAction::CreateProposal {
            title: "Community fridge".into(),
            description: "Fund a shared fridge for the market".into(),
            category: ProposalCategory::Other,
            voting_deadline: NOW + 7 * 86_400,
            execution_payload: Payload::default(),
        },
        &ctx("alice"),
    )
}

fn vote(record: GovernanceRecord, voter: &str, choice: VoteChoice) -> GovernanceRecord {
    accepted(Some(&record), GovernanceAction::CastVote { proposal_id: 0, vote: choice }, &ctx(voter))
}

fn with_votes(record: GovernanceRecord, for_votes: usize, against: usize) -> GovernanceRecord {
    let ballots = (0..for_votes)
        .map(|i| (format!("yes-{}", i), VoteChoice::For))
        .chain((0..against).map(|i| (format!("no-{}", i), VoteChoice::Against)));
    ballots.fold(record, |record, (voter, choice)| vote(record, &voter, choice))
}

fn execute(record: &GovernanceRecord) -> Verdict {
    step(Some(record), GovernanceAction::ExecuteProposal { proposal_id: 0 }, &ctx("erin")).0
}

#[test_log::test]
fn test_bootstrap_proposal() {
    let record = open_proposal();
    assert_eq!(record.next_proposal_id, 1);
    assert_eq!(record.proposals[0].status, ProposalStatus::Active);
    assert_eq!(record.proposals[0].creation_time, NOW);
}

#[test_log::test]
fn test_three_for_one_against_executes() {
    let record = with_votes(open_proposal(), 3, 1);
    assert_eq!(record.proposals[0].tally().total(), 4);
    assert!(execute(&record).is_accepted());
}

#[test_log::test]
fn test_split_vote_does_not_execute() {
    let record = with_votes(open_proposal(), 1, 1);
    let verdict = execute(&record);
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Precondition));
}

#[test_log::test]
fn test_double_vote_rejected() {
    let record = vote(open_proposal(), "bob", VoteChoice::For);
    let (verdict, _) = step(
        Some(&record),
        GovernanceAction::CastVote { proposal_id: 0, vote: VoteChoice::Against },
        &ctx("bob"),
    );
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Precondition));
}

#[test_log::test]
fn test_update_params_threshold_range() {
    let record = open_proposal();

    let low = GovernanceParams { approval_threshold: 40, ..GovernanceParams::default() };
    let (verdict, _) = step(Some(&record), GovernanceAction::UpdateParams { new_params: low }, &ctx("bob"));
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Precondition));

    let raised = GovernanceParams { approval_threshold: 70, ..GovernanceParams::default() };
    let updated = accepted(Some(&record), GovernanceAction::UpdateParams { new_params: raised }, &ctx("bob"));
    assert_eq!(updated.params, raised);
    assert_eq!(updated.proposals, record.proposals);
}

#[test_log::test]
fn test_executed_proposal_is_final() {
    let record = with_votes(open_proposal(), 2, 0);
    let executed = accepted(Some(&record), GovernanceAction::ExecuteProposal { proposal_id: 0 }, &ctx("erin"));
    assert_eq!(executed.proposals[0].status, ProposalStatus::Executed);

    assert!(!execute(&executed).is_accepted());
    let (verdict, _) = step(
        Some(&executed),
        GovernanceAction::CastVote { proposal_id: 0, vote: VoteChoice::For },
        &ctx("zoe"),
    );
    assert!(!verdict.is_accepted());
}

#[test_log::test]
fn test_cancelled_proposal_takes_no_votes() {
    let record = open_proposal();
    let cancelled = accepted(Some(&record), GovernanceAction::CancelProposal { proposal_id: 0 }, &ctx("alice"));
    assert_eq!(cancelled.proposals[0].status, ProposalStatus::Cancelled);

    let (verdict, _) = step(
        Some(&cancelled),
        GovernanceAction::CastVote { proposal_id: 0, vote: VoteChoice::For },
        &ctx("bob"),
    );
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Precondition));
}

#[test_log::test]
fn test_second_proposal_gets_next_id() {
    let record = open_proposal();
    let action = GovernanceAction::CreateProposal {
        title: "Paint the shopfront".into(),
        description: "Two coats, member labour".into(),
        category: ProposalCategory::ParameterChange,
        voting_deadline: NOW + 2 * 86_400,
        execution_payload: Payload::new(vec![1, 2, 3]),
    };
    let record = accepted(Some(&record), action, &ctx("bob"));

    assert_eq!(record.next_proposal_id, 2);
    assert_eq!(record.proposals.len(), 2);
    assert_eq!(record.proposal(1).map(|p| p.execution_payload.len()), Some(3));
}

#[test_log::test]
fn test_no_successor_rejected() {
    let record = open_proposal();
    let verdict = validate(
        &validator(),
        Some(&record),
        &GovernanceAction::CancelProposal { proposal_id: 0 },
        &ctx("alice"),
        &[],
    );
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));
}

#[test_log::test]
fn test_successor_with_extra_field_rejected() {
    let record = open_proposal();
    let action = GovernanceAction::CastVote { proposal_id: 0, vote: VoteChoice::For };
    let new = build_successor(Some(&record), None, &action, &ctx("bob")).unwrap();

    let mut smuggled = serde_json::to_value(&new).unwrap();
    smuggled["proposals"][0]["veto"] = serde_json::json!("mallory");
    let verdict = validate(&validator(), Some(&record), &action, &ctx("bob"), &[Payload::encode(&smuggled).unwrap()]);
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));
}

#[test_log::test]
fn test_successor_with_repeated_ballot_rejected() {
    let record = open_proposal();
    let action = GovernanceAction::CastVote { proposal_id: 0, vote: VoteChoice::For };
    let new = build_successor(Some(&record), None, &action, &ctx("bob")).unwrap();

    let canonical = String::from_utf8(Payload::encode(&new).unwrap().as_bytes().to_vec()).unwrap();
    let repeated = canonical.replacen("\"votes\":{\"bob\"", "\"votes\":{\"bob\":\"Against\",\"bob\"", 1);
    assert_ne!(canonical, repeated);

    let verdict = validate(&validator(), Some(&record), &action, &ctx("bob"), &[Payload::new(repeated.into_bytes())]);
    assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));
}

proptest! {
    #[test]
    fn prop_counters_match_vote_count(choices in proptest::collection::vec(0u8..3, 0..20)) {
        let mut record = open_proposal();
        for (i, choice) in choices.iter().enumerate() {
            let choice = match choice {
                0 => VoteChoice::For,
                1 => VoteChoice::Against,
                _ => VoteChoice::Abstain,
            };
            record = vote(record, &format!("member-{:02}", i), choice);
        }

        let proposal = &record.proposals[0];
        prop_assert_eq!(proposal.tally().total(), choices.len() as u128);
        prop_assert_eq!(proposal.recount(), proposal.tally());
        prop_assert_eq!(proposal.votes.len(), choices.len());
    }
}
