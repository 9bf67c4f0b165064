//! Treasury transition validator
//!
//! Checks one proposed successor of a [`TreasuryRecord`] against the action
//! that produced it. A pending entry is created by `ProposeTransaction`,
//! collects approvals, and is removed exactly once by either
//! `ExecuteTransaction` (the record moves into the history) or
//! `CancelTransaction` (nothing is recorded).

use tracing::debug;

use icn_common::{AcceptAllOutputs, ExecutionOutputVerifier, Identity, Payload, ValidatorConfig};
use icn_policy::{
    value_of, verify_transition, DiffViolation, FieldPolicy, FieldRule, Predicate, ValidationContext,
    ValidationError, ValidationResult, Workflow,
};

use crate::action::TreasuryAction;
use crate::types::{fields, PendingTransaction, TransactionRecord, TransactionType, TreasuryRecord};

/// Validator for treasury transitions
#[derive(Debug, Clone)]
pub struct TreasuryValidator<V = AcceptAllOutputs> {
    /// Required approvals for types missing from a treasury's thresholds
    default_required_approvals: u32,
    /// Legitimacy check for the outputs of an execution
    outputs: V,
}

impl Default for TreasuryValidator<AcceptAllOutputs> {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}

impl TreasuryValidator<AcceptAllOutputs> {
    /// Create a validator that leaves fund movement to the surrounding environment
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            default_required_approvals: config.default_required_approvals,
            outputs: AcceptAllOutputs,
        }
    }
}

impl<V: ExecutionOutputVerifier> TreasuryValidator<V> {
    /// Create a validator that consults `outputs` when a transaction executes
    pub fn with_output_verifier(config: &ValidatorConfig, outputs: V) -> Self {
        Self {
            default_required_approvals: config.default_required_approvals,
            outputs,
        }
    }

    fn validate_contribute(
        &self,
        old: Option<&TreasuryRecord>,
        amount: u64,
        description: &str,
        ctx: &ValidationContext,
        new: &TreasuryRecord,
    ) -> ValidationResult<()> {
        let signer = ctx.require_signer()?;

        if amount == 0 {
            return Err(ValidationError::precondition("contribution amount must be positive"));
        }

        let contribution = contribution_matches(amount, signer, description);

        match old {
            Some(old) => {
                debug!(amount, %signer, "checking contribution to existing treasury");
                let policy = FieldPolicy::new()
                    .allow(fields::BALANCE, FieldRule::Unrestricted)
                    .allow(fields::TRANSACTION_HISTORY, FieldRule::AppendExactlyOne(contribution));
                verify_transition(old, new, &policy)?;
            }
            None => {
                debug!(amount, %signer, "checking bootstrap contribution");
                validate_bootstrap(new, &contribution)?;
            }
        }

        Ok(())
    }

    fn validate_propose(
        &self,
        old: &TreasuryRecord,
        transaction: &TransactionRecord,
        ctx: &ValidationContext,
        new: &TreasuryRecord,
    ) -> ValidationResult<()> {
        let signer = ctx.require_signer()?;

        if transaction.amount == 0 {
            return Err(ValidationError::precondition("proposed amount must be positive"));
        }

        if &transaction.member != signer {
            return Err(ValidationError::authorization(format!(
                "proposal is attributed to {} but signed by {}",
                transaction.member, signer
            )));
        }

        if transaction.tx_type == TransactionType::Contribution {
            return Err(ValidationError::precondition(
                "contributions are recorded directly, not proposed",
            ));
        }

        if transaction.description.trim().is_empty() {
            return Err(ValidationError::precondition("proposal description cannot be empty"));
        }

        let required = old.required_approvals_for(transaction.tx_type, self.default_required_approvals);
        let entry = PendingTransaction::proposed(transaction.clone(), required);
        debug!(tx_type = %transaction.tx_type, required, "checking proposed transaction");

        let policy = FieldPolicy::new().allow(
            fields::PENDING_TRANSACTIONS,
            FieldRule::AppendExactlyOne(Predicate::equals(value_of(&entry)?)),
        );
        verify_transition(old, new, &policy)?;

        Ok(())
    }

    fn validate_approve(
        &self,
        old: &TreasuryRecord,
        index: usize,
        ctx: &ValidationContext,
        new: &TreasuryRecord,
    ) -> ValidationResult<()> {
        let signer = ctx.require_signer()?;
        let entry = pending_entry(old, index)?;

        if entry.has_approved(signer) {
            return Err(ValidationError::precondition(format!(
                "{} already approved pending transaction {}",
                signer, index
            )));
        }

        debug!(index, %signer, approvals = entry.approvals.len(), "checking approval");

        let policy = FieldPolicy::new().allow(
            fields::PENDING_TRANSACTIONS,
            FieldRule::ReplaceEntryAt(
                index,
                FieldPolicy::new().allow(fields::APPROVALS, FieldRule::ContainsAllPlusOne(value_of(signer)?)),
            ),
        );
        verify_transition(old, new, &policy)?;

        Ok(())
    }

    fn validate_execute(
        &self,
        old: &TreasuryRecord,
        index: usize,
        ctx: &ValidationContext,
        new: &TreasuryRecord,
    ) -> ValidationResult<()> {
        let entry = pending_entry(old, index)?;

        if !entry.is_executable() {
            return Err(ValidationError::precondition(format!(
                "pending transaction {} has {} of {} required approvals",
                index,
                entry.approvals.len(),
                entry.required_approvals
            )));
        }

        debug!(index, tx_type = %entry.transaction_record.tx_type, "checking execution");

        let policy = FieldPolicy::new()
            .allow(fields::BALANCE, FieldRule::Unrestricted)
            .allow(fields::PENDING_TRANSACTIONS, FieldRule::ReplacedWith(value_of(&old.pending_without(index))?))
            .allow(
                fields::TRANSACTION_HISTORY,
                FieldRule::AppendExactlyOne(Predicate::equals(value_of(&entry.transaction_record)?)),
            );
        verify_transition(old, new, &policy)?;

        let record = Payload::encode(&entry.transaction_record)?;
        let tx_type = entry.transaction_record.tx_type.as_str();
        if !self.outputs.verify_execution_outputs(tx_type, &record, &ctx.produced_outputs) {
            return Err(ValidationError::precondition(format!(
                "outputs produced for {} execution were not accepted",
                tx_type
            )));
        }

        Ok(())
    }

    fn validate_cancel(
        &self,
        old: &TreasuryRecord,
        index: usize,
        ctx: &ValidationContext,
        new: &TreasuryRecord,
    ) -> ValidationResult<()> {
        let entry = pending_entry(old, index)?;
        let proposer = &entry.transaction_record.member;

        if !ctx.is_signed_by(proposer) {
            return Err(ValidationError::authorization(format!(
                "only the proposer {} may cancel pending transaction {}",
                proposer, index
            )));
        }

        debug!(index, %proposer, "checking cancellation");

        let policy = FieldPolicy::new().allow(
            fields::PENDING_TRANSACTIONS,
            FieldRule::ReplacedWith(value_of(&old.pending_without(index))?),
        );
        verify_transition(old, new, &policy)?;

        Ok(())
    }
}

impl<V: ExecutionOutputVerifier> Workflow for TreasuryValidator<V> {
    type Record = TreasuryRecord;
    type Action = TreasuryAction;

    const NAME: &'static str = "treasury";

    fn validate_transition(
        &self,
        old: Option<&TreasuryRecord>,
        action: &TreasuryAction,
        ctx: &ValidationContext,
        new: &TreasuryRecord,
    ) -> ValidationResult<()> {
        match action {
            TreasuryAction::Contribute { amount, description } => {
                self.validate_contribute(old, *amount, description, ctx, new)
            }
            TreasuryAction::ProposeTransaction { transaction } => {
                self.validate_propose(existing(old, action)?, transaction, ctx, new)
            }
            TreasuryAction::ApproveTransaction { index } => {
                self.validate_approve(existing(old, action)?, *index, ctx, new)
            }
            TreasuryAction::ExecuteTransaction { index } => {
                self.validate_execute(existing(old, action)?, *index, ctx, new)
            }
            TreasuryAction::CancelTransaction { index } => {
                self.validate_cancel(existing(old, action)?, *index, ctx, new)
            }
        }
    }
}

fn existing<'r>(old: Option<&'r TreasuryRecord>, action: &TreasuryAction) -> ValidationResult<&'r TreasuryRecord> {
    old.ok_or_else(|| {
        ValidationError::precondition(format!("{} requires an existing treasury record", action.name()))
    })
}

fn pending_entry(record: &TreasuryRecord, index: usize) -> ValidationResult<&PendingTransaction> {
    record.pending(index).ok_or_else(|| {
        ValidationError::precondition(format!(
            "no pending transaction at index {} ({} pending)",
            index,
            record.pending_transactions.len()
        ))
    })
}

/// The history entry a contribution must append. Its time is not constrained.
fn contribution_matches<'a>(amount: u64, signer: &'a Identity, description: &'a str) -> Predicate<'a> {
    Predicate::decoded(move |record: &TransactionRecord| {
        record.tx_type == TransactionType::Contribution
            && record.amount == amount
            && &record.member == signer
            && record.description == description
    })
}

fn validate_bootstrap(new: &TreasuryRecord, contribution: &Predicate<'_>) -> ValidationResult<()> {
    if new.entity.is_empty() {
        return Err(DiffViolation::SuccessorShapeInvalid("bootstrap treasury has no entity reference".into()).into());
    }

    if !new.balance.is_empty() {
        return Err(DiffViolation::SuccessorShapeInvalid("bootstrap treasury must start with an empty balance".into()).into());
    }

    if new.transaction_history.len() != 1 {
        return Err(DiffViolation::SequenceLengthMismatch {
            field: fields::TRANSACTION_HISTORY.into(),
            expected: 1,
            actual: new.transaction_history.len(),
        }
        .into());
    }

    if !contribution.matches(&value_of(&new.transaction_history[0])?) {
        return Err(DiffViolation::ElementMismatch {
            field: fields::TRANSACTION_HISTORY.into(),
            index: 0,
        }
        .into());
    }

    if !new.pending_transactions.is_empty() {
        return Err(DiffViolation::SequenceLengthMismatch {
            field: fields::PENDING_TRANSACTIONS.into(),
            expected: 0,
            actual: new.pending_transactions.len(),
        }
        .into());
    }

    if new.approval_thresholds.is_empty() {
        return Err(DiffViolation::SuccessorShapeInvalid("bootstrap treasury needs approval thresholds".into()).into());
    }

    Ok(())
}
