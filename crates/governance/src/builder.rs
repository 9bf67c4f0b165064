//! Canonical successor construction
//!
//! Builds the governance record an honest transaction builder submits for an
//! action. The result still has to pass [`GovernanceValidator`](crate::GovernanceValidator).

use serde::{Deserialize, Serialize};

use icn_common::RecordRef;
use icn_policy::{ValidationContext, ValidationError, ValidationResult};

use crate::action::GovernanceAction;
use crate::{GovernanceParams, GovernanceRecord, Proposal, ProposalStatus};

/// What a bootstrap proposal needs besides the action itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernanceGenesis {
    pub entity: RecordRef,
    pub treasury: RecordRef,
    pub params: GovernanceParams,
}

/// Build the successor of `old` under `action`.
///
/// A bootstrap `CreateProposal` (no `old`) takes its references and params
/// from `genesis`. Creation times come from the context's reference time.
pub fn build_successor(
    old: Option<&GovernanceRecord>,
    genesis: Option<&GovernanceGenesis>,
    action: &GovernanceAction,
    ctx: &ValidationContext,
) -> ValidationResult<GovernanceRecord> {
    if let GovernanceAction::CreateProposal {
        title,
        description,
        category,
        voting_deadline,
        execution_payload,
    } = action
    {
        let proposal = Proposal::new(
            title.clone(),
            description.clone(),
            *category,
            ctx.require_signer()?.clone(),
            ctx.reference_time,
            *voting_deadline,
            execution_payload.clone(),
        );

        return match old {
            Some(old) => {
                let mut new = old.clone();
                new.proposals.push(proposal);
                new.next_proposal_id = old.next_proposal_id.saturating_add(1);
                Ok(new)
            }
            None => {
                let genesis = genesis.ok_or_else(|| {
                    ValidationError::state_shape("bootstrap proposal needs membership and treasury references")
                })?;
                Ok(GovernanceRecord {
                    entity: genesis.entity.clone(),
                    treasury: genesis.treasury.clone(),
                    params: genesis.params,
                    proposals: vec![proposal],
                    next_proposal_id: 1,
                })
            }
        };
    }

    let old = old.ok_or_else(|| {
        ValidationError::precondition(format!("{} requires an existing governance record", action.name()))
    })?;
    let mut new = old.clone();

    match action {
        GovernanceAction::CreateProposal { .. } => {}
        GovernanceAction::CastVote { proposal_id, vote } => {
            let voter = ctx.require_signer()?.clone();
            proposal_mut(&mut new, *proposal_id)?.record_vote(voter, *vote);
        }
        GovernanceAction::ExecuteProposal { proposal_id } => {
            proposal_mut(&mut new, *proposal_id)?.status = ProposalStatus::Executed;
        }
        GovernanceAction::CancelProposal { proposal_id } => {
            proposal_mut(&mut new, *proposal_id)?.status = ProposalStatus::Cancelled;
        }
        GovernanceAction::UpdateParams { new_params } => {
            new.params = *new_params;
        }
    }

    Ok(new)
}

fn proposal_mut(record: &mut GovernanceRecord, proposal_id: u64) -> ValidationResult<&mut Proposal> {
    usize::try_from(proposal_id)
        .ok()
        .and_then(|index| record.proposals.get_mut(index))
        .ok_or_else(|| ValidationError::precondition(format!("no proposal with id {}", proposal_id)))
}
