//! Governance transition validator
//!
//! Checks one proposed successor of a [`GovernanceRecord`] against the action
//! that produced it. Proposals are only ever appended; afterwards a proposal
//! changes by gaining votes while `Active`, or by moving to `Executed` or
//! `Cancelled`.

use serde_json::{Map, Value};
use tracing::debug;

use icn_common::{
    MembershipRegistry, ParamsAuthorization, Payload, QuorumMode, StaticMembership, ValidatorConfig,
    VoteDeadlineMode,
};
use icn_policy::{
    value_of, verify_transition, DiffViolation, FieldPolicy, FieldRule, Predicate, ValidationContext,
    ValidationError, ValidationResult, Workflow,
};

use crate::action::GovernanceAction;
use crate::execution::{authorize_privileged, CategoryExecutor, ProposalExecutor};
use crate::voting::{ElectorateQuorum, VoteCountQuorum, VotingResult, VotingScheme};
use crate::{fields, GovernanceParams, GovernanceRecord, Proposal, ProposalCategory, ProposalStatus, VoteChoice};

/// Validator for governance transitions
#[derive(Debug, Clone)]
pub struct GovernanceValidator<M = StaticMembership> {
    quorum_mode: QuorumMode,
    vote_deadline: VoteDeadlineMode,
    params_authorization: ParamsAuthorization,
    /// Membership snapshot for admin lookups and the electorate size
    registry: M,
}

impl GovernanceValidator<StaticMembership> {
    /// Create a validator with an empty membership snapshot
    pub fn new(config: &ValidatorConfig) -> Self {
        Self::with_registry(config, StaticMembership::default())
    }
}

impl<M: MembershipRegistry> GovernanceValidator<M> {
    /// Create a validator that consults `registry`
    pub fn with_registry(config: &ValidatorConfig, registry: M) -> Self {
        Self {
            quorum_mode: config.quorum_mode,
            vote_deadline: config.vote_deadline,
            params_authorization: config.params_authorization,
            registry,
        }
    }

    /// Evaluate a proposal's current tally under the configured quorum mode
    pub fn tally(&self, proposal: &Proposal, params: &GovernanceParams) -> VotingResult {
        match self.quorum_mode {
            QuorumMode::Literal => VoteCountQuorum.tally_votes(proposal.tally(), params),
            QuorumMode::Electorate => {
                ElectorateQuorum::new(self.registry.member_count()).tally_votes(proposal.tally(), params)
            }
        }
    }

    /// Whether a proposal still accepts votes under the configured deadline mode
    pub fn is_open(&self, proposal: &Proposal, ctx: &ValidationContext) -> bool {
        match self.vote_deadline {
            // Both sides are fixed at creation.
            VoteDeadlineMode::Literal => proposal.creation_time < proposal.voting_deadline,
            VoteDeadlineMode::SubmissionBound => ctx.reference_time <= proposal.voting_deadline,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_create(
        &self,
        old: Option<&GovernanceRecord>,
        title: &str,
        description: &str,
        category: ProposalCategory,
        voting_deadline: u64,
        execution_payload: &Payload,
        ctx: &ValidationContext,
        new: &GovernanceRecord,
    ) -> ValidationResult<()> {
        let proposer = ctx.require_signer()?;

        if title.trim().is_empty() {
            return Err(ValidationError::precondition("proposal title cannot be empty"));
        }

        if description.trim().is_empty() {
            return Err(ValidationError::precondition("proposal description cannot be empty"));
        }

        let expected = Proposal::new(
            title.to_string(),
            description.to_string(),
            category,
            proposer.clone(),
            ctx.reference_time,
            voting_deadline,
            execution_payload.clone(),
        );

        match old {
            Some(old) => {
                let earliest = ctx
                    .reference_time
                    .checked_add(old.params.minimum_voting_period)
                    .ok_or_else(|| ValidationError::precondition("voting period overflows the time range"))?;
                if voting_deadline <= earliest {
                    return Err(ValidationError::precondition(format!(
                        "voting deadline {} must be after {}",
                        voting_deadline, earliest
                    )));
                }

                let next_id = old
                    .next_proposal_id
                    .checked_add(1)
                    .ok_or_else(|| ValidationError::precondition("proposal id space exhausted"))?;

                debug!(%proposer, ?category, proposal_id = old.next_proposal_id, "checking new proposal");

                let policy = FieldPolicy::new()
                    .allow(fields::PROPOSALS, FieldRule::AppendExactlyOne(Predicate::equals(value_of(&expected)?)))
                    .allow(fields::NEXT_PROPOSAL_ID, FieldRule::ReplacedWith(value_of(&next_id)?));
                verify_transition(old, new, &policy)?;
            }
            None => {
                // No minimum period applies before there are params to read it from
                if voting_deadline <= ctx.reference_time {
                    return Err(ValidationError::precondition(format!(
                        "voting deadline {} must be after {}",
                        voting_deadline, ctx.reference_time
                    )));
                }

                debug!(%proposer, ?category, "checking bootstrap proposal");
                validate_bootstrap(new, &expected)?;
            }
        }

        Ok(())
    }

    fn validate_vote(
        &self,
        old: &GovernanceRecord,
        proposal_id: u64,
        vote: VoteChoice,
        ctx: &ValidationContext,
        new: &GovernanceRecord,
    ) -> ValidationResult<()> {
        let voter = ctx.require_signer()?;
        let (index, proposal) = proposal_at(old, proposal_id)?;

        if proposal.status != ProposalStatus::Active {
            return Err(ValidationError::precondition(format!(
                "proposal {} is {:?}, not Active",
                proposal_id, proposal.status
            )));
        }

        if !self.is_open(proposal, ctx) {
            return Err(ValidationError::precondition(format!(
                "voting on proposal {} closed at {}",
                proposal_id, proposal.voting_deadline
            )));
        }

        if proposal.has_voted(voter) {
            return Err(ValidationError::precondition(format!(
                "{} already voted on proposal {}",
                voter, proposal_id
            )));
        }

        let counter = vote.tally_field();
        let current = match vote {
            VoteChoice::For => proposal.for_votes,
            VoteChoice::Against => proposal.against_votes,
            VoteChoice::Abstain => proposal.abstain_votes,
        };
        let incremented = current
            .checked_add(1)
            .ok_or_else(|| ValidationError::precondition("vote counter overflow"))?;

        let mut ballot = Map::new();
        ballot.insert(voter.to_string(), value_of(&vote)?);

        debug!(proposal_id, %voter, %vote, "checking vote");

        let policy = FieldPolicy::new().allow(
            fields::PROPOSALS,
            FieldRule::ReplaceEntryAt(
                index,
                FieldPolicy::new()
                    .allow(fields::VOTES, FieldRule::ContainsAllPlusOne(Value::Object(ballot)))
                    .allow(counter, FieldRule::ReplacedWith(value_of(&incremented)?)),
            ),
        );
        verify_transition(old, new, &policy)?;

        // The diff only proves the counter moved with the vote; the totals must also agree
        let updated = new.proposals.get(index).ok_or_else(|| {
            ValidationError::from(DiffViolation::SequenceLengthMismatch {
                field: fields::PROPOSALS.into(),
                expected: old.proposals.len(),
                actual: new.proposals.len(),
            })
        })?;
        if updated.recount() != updated.tally() {
            return Err(DiffViolation::SuccessorShapeInvalid(format!(
                "vote counters of proposal {} disagree with its recorded votes",
                proposal_id
            ))
            .into());
        }

        Ok(())
    }

    fn validate_execute(
        &self,
        old: &GovernanceRecord,
        proposal_id: u64,
        ctx: &ValidationContext,
        new: &GovernanceRecord,
    ) -> ValidationResult<()> {
        let (index, proposal) = proposal_at(old, proposal_id)?;

        match proposal.status {
            ProposalStatus::Approved => {
                debug!(proposal_id, "executing previously approved proposal");
            }
            ProposalStatus::Active => {
                let result = self.tally(proposal, &old.params);
                debug!(
                    proposal_id,
                    for_votes = proposal.for_votes,
                    against_votes = proposal.against_votes,
                    abstain_votes = proposal.abstain_votes,
                    approved = result.approved,
                    has_quorum = result.has_quorum,
                    "evaluated tally"
                );
                if !result.passes() {
                    return Err(ValidationError::precondition(format!(
                        "proposal {} has not passed (approved: {}, quorum: {})",
                        proposal_id, result.approved, result.has_quorum
                    )));
                }
            }
            status => {
                return Err(ValidationError::precondition(format!(
                    "proposal {} is {:?} and cannot be executed",
                    proposal_id, status
                )));
            }
        }

        CategoryExecutor::new(&self.registry, self.params_authorization).check_execution(proposal, old, ctx)?;

        let policy = status_change(index, ProposalStatus::Executed)?;
        verify_transition(old, new, &policy)?;

        Ok(())
    }

    fn validate_cancel(
        &self,
        old: &GovernanceRecord,
        proposal_id: u64,
        ctx: &ValidationContext,
        new: &GovernanceRecord,
    ) -> ValidationResult<()> {
        let (index, proposal) = proposal_at(old, proposal_id)?;

        if proposal.status != ProposalStatus::Active {
            return Err(ValidationError::precondition(format!(
                "proposal {} is {:?}, not Active",
                proposal_id, proposal.status
            )));
        }

        if !ctx.is_signed_by(&proposal.proposer) {
            return Err(ValidationError::authorization(format!(
                "only the proposer {} may cancel proposal {}",
                proposal.proposer, proposal_id
            )));
        }

        debug!(proposal_id, proposer = %proposal.proposer, "checking cancellation");

        let policy = status_change(index, ProposalStatus::Cancelled)?;
        verify_transition(old, new, &policy)?;

        Ok(())
    }

    fn validate_update_params(
        &self,
        old: &GovernanceRecord,
        new_params: &GovernanceParams,
        ctx: &ValidationContext,
        new: &GovernanceRecord,
    ) -> ValidationResult<()> {
        let signer = authorize_privileged(ctx, &self.registry, self.params_authorization)?;

        new_params.validate().map_err(ValidationError::precondition)?;

        debug!(%signer, ?new_params, "checking parameter update");

        let policy = FieldPolicy::new().allow(fields::PARAMS, FieldRule::ReplacedWith(value_of(new_params)?));
        verify_transition(old, new, &policy)?;

        Ok(())
    }
}

impl<M: MembershipRegistry> Workflow for GovernanceValidator<M> {
    type Record = GovernanceRecord;
    type Action = GovernanceAction;

    const NAME: &'static str = "governance";

    fn validate_transition(
        &self,
        old: Option<&GovernanceRecord>,
        action: &GovernanceAction,
        ctx: &ValidationContext,
        new: &GovernanceRecord,
    ) -> ValidationResult<()> {
        match action {
            GovernanceAction::CreateProposal {
                title,
                description,
                category,
                voting_deadline,
                execution_payload,
            } => self.validate_create(
                old,
                title,
                description,
                *category,
                *voting_deadline,
                execution_payload,
                ctx,
                new,
            ),
            GovernanceAction::CastVote { proposal_id, vote } => {
                self.validate_vote(existing(old, action)?, *proposal_id, *vote, ctx, new)
            }
            GovernanceAction::ExecuteProposal { proposal_id } => {
                self.validate_execute(existing(old, action)?, *proposal_id, ctx, new)
            }
            GovernanceAction::CancelProposal { proposal_id } => {
                self.validate_cancel(existing(old, action)?, *proposal_id, ctx, new)
            }
            GovernanceAction::UpdateParams { new_params } => {
                self.validate_update_params(existing(old, action)?, new_params, ctx, new)
            }
        }
    }
}

fn existing<'r>(
    old: Option<&'r GovernanceRecord>,
    action: &GovernanceAction,
) -> ValidationResult<&'r GovernanceRecord> {
    old.ok_or_else(|| {
        ValidationError::precondition(format!("{} requires an existing governance record", action.name()))
    })
}

fn proposal_at(record: &GovernanceRecord, proposal_id: u64) -> ValidationResult<(usize, &Proposal)> {
    usize::try_from(proposal_id)
        .ok()
        .and_then(|index| record.proposals.get(index).map(|proposal| (index, proposal)))
        .ok_or_else(|| {
            ValidationError::precondition(format!(
                "no proposal with id {} ({} proposals)",
                proposal_id,
                record.proposals.len()
            ))
        })
}

/// Only the addressed proposal's status may change
fn status_change(index: usize, status: ProposalStatus) -> ValidationResult<FieldPolicy<'static>> {
    Ok(FieldPolicy::new().allow(
        fields::PROPOSALS,
        FieldRule::ReplaceEntryAt(
            index,
            FieldPolicy::new().allow(fields::STATUS, FieldRule::ReplacedWith(value_of(&status)?)),
        ),
    ))
}

fn validate_bootstrap(new: &GovernanceRecord, expected: &Proposal) -> ValidationResult<()> {
    if new.entity.is_empty() || new.treasury.is_empty() {
        return Err(DiffViolation::SuccessorShapeInvalid(
            "bootstrap governance needs membership and treasury references".into(),
        )
        .into());
    }

    if let Err(reason) = new.params.validate() {
        return Err(DiffViolation::SuccessorShapeInvalid(format!("bootstrap params invalid: {}", reason)).into());
    }

    if new.proposals.len() != 1 {
        return Err(DiffViolation::SequenceLengthMismatch {
            field: fields::PROPOSALS.into(),
            expected: 1,
            actual: new.proposals.len(),
        }
        .into());
    }

    if &new.proposals[0] != expected {
        return Err(DiffViolation::ElementMismatch {
            field: fields::PROPOSALS.into(),
            index: 0,
        }
        .into());
    }

    if new.next_proposal_id != 1 {
        return Err(DiffViolation::FieldUnexpectedlyChanged(fields::NEXT_PROPOSAL_ID.into()).into());
    }

    Ok(())
}
