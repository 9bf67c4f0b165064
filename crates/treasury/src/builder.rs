//! Canonical successor construction
//!
//! Builds the successor record an honest transaction builder submits for an
//! action. The result still has to pass [`TreasuryValidator`](crate::TreasuryValidator);
//! only the checks needed to construct it are repeated here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use icn_common::RecordRef;
use icn_policy::{ValidationContext, ValidationError, ValidationResult};

use crate::action::TreasuryAction;
use crate::types::{PendingTransaction, TransactionRecord, TransactionType, TreasuryRecord};

/// What a bootstrap contribution needs besides the action itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Genesis {
    pub entity: RecordRef,
    pub approval_thresholds: BTreeMap<TransactionType, u32>,
}

/// Build the successor of `old` under `action`.
///
/// A bootstrap `Contribute` (no `old`) takes its entity and thresholds from
/// `genesis`. Contribution times come from the context's reference time.
pub fn build_successor(
    old: Option<&TreasuryRecord>,
    genesis: Option<&Genesis>,
    action: &TreasuryAction,
    ctx: &ValidationContext,
    default_required_approvals: u32,
) -> ValidationResult<TreasuryRecord> {
    match (old, action) {
        (None, TreasuryAction::Contribute { amount, description }) => {
            let signer = ctx.require_signer()?;
            let genesis = genesis.ok_or_else(|| {
                ValidationError::state_shape("bootstrap contribution needs an entity and approval thresholds")
            })?;
            let contribution = TransactionRecord::new(
                TransactionType::Contribution,
                *amount,
                signer.clone(),
                ctx.reference_time,
                description.clone(),
            );
            Ok(TreasuryRecord::bootstrap(
                genesis.entity.clone(),
                genesis.approval_thresholds.clone(),
                contribution,
            ))
        }
        (None, other) => Err(ValidationError::precondition(format!(
            "{} requires an existing treasury record",
            other.name()
        ))),
        (Some(old), TreasuryAction::Contribute { amount, description }) => {
            let signer = ctx.require_signer()?;
            let mut new = old.clone();
            new.transaction_history.push(TransactionRecord::new(
                TransactionType::Contribution,
                *amount,
                signer.clone(),
                ctx.reference_time,
                description.clone(),
            ));
            Ok(new)
        }
        (Some(old), TreasuryAction::ProposeTransaction { transaction }) => {
            let required = old.required_approvals_for(transaction.tx_type, default_required_approvals);
            let mut new = old.clone();
            new.pending_transactions
                .push(PendingTransaction::proposed(transaction.clone(), required));
            Ok(new)
        }
        (Some(old), TreasuryAction::ApproveTransaction { index }) => {
            let signer = ctx.require_signer()?.clone();
            let mut new = old.clone();
            let entry = new
                .pending_transactions
                .get_mut(*index)
                .ok_or_else(|| missing(*index))?;
            entry.approvals.insert(signer);
            Ok(new)
        }
        (Some(old), TreasuryAction::ExecuteTransaction { index }) => {
            let entry = old.pending(*index).ok_or_else(|| missing(*index))?;
            let mut new = old.clone();
            new.pending_transactions = old.pending_without(*index);
            new.transaction_history.push(entry.transaction_record.clone());
            Ok(new)
        }
        (Some(old), TreasuryAction::CancelTransaction { index }) => {
            old.pending(*index).ok_or_else(|| missing(*index))?;
            let mut new = old.clone();
            new.pending_transactions = old.pending_without(*index);
            Ok(new)
        }
    }
}

fn missing(index: usize) -> ValidationError {
    ValidationError::precondition(format!("no pending transaction at index {}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use icn_common::SignerSet;

    fn genesis() -> Genesis {
        let mut approval_thresholds = BTreeMap::new();
        approval_thresholds.insert(TransactionType::Transfer, 2);
        Genesis {
            entity: RecordRef::new("membership#0"),
            approval_thresholds,
        }
    }

    #[test]
    fn test_bootstrap_successor() {
        let ctx = ValidationContext::new(["alice"].into_iter().collect::<SignerSet>(), 42);
        let action = TreasuryAction::Contribute { amount: 5_000_000, description: "seed".into() };

        let record = build_successor(None, Some(&genesis()), &action, &ctx, 2).unwrap();
        assert_eq!(record.transaction_history.len(), 1);
        assert_eq!(record.transaction_history[0].time, 42);
        assert!(record.pending_transactions.is_empty());

        assert!(build_successor(None, None, &action, &ctx, 2).is_err());
    }

    #[test]
    fn test_missing_index() {
        let ctx = ValidationContext::new(["alice"].into_iter().collect::<SignerSet>(), 42);
        let action = TreasuryAction::Contribute { amount: 1, description: "seed".into() };
        let record = build_successor(None, Some(&genesis()), &action, &ctx, 2).unwrap();

        let approve = TreasuryAction::ApproveTransaction { index: 0 };
        assert!(build_successor(Some(&record), None, &approve, &ctx, 2).is_err());
    }
}
