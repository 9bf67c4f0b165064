//! The validation boundary
//!
//! A workflow checks one proposed transition of its record. The entry point
//! decodes the single successor payload, runs the workflow, logs the outcome
//! and returns a [`Verdict`].

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use icn_common::Payload;

use crate::context::ValidationContext;
use crate::rejection::{DiffViolation, ValidationError, ValidationResult, Verdict};

/// A closed set of actions over one singleton record
pub trait Workflow {
    type Record: Serialize + DeserializeOwned + Debug;
    type Action: Debug;

    /// Name used in logs
    const NAME: &'static str;

    /// Check that `new` is an acceptable successor of `old` under `action`.
    /// `old` is `None` when the action bootstraps the record.
    fn validate_transition(
        &self,
        old: Option<&Self::Record>,
        action: &Self::Action,
        ctx: &ValidationContext,
        new: &Self::Record,
    ) -> ValidationResult<()>;
}

/// Decode the one successor a transition must produce.
///
/// The payload must be the canonical encoding of the record it decodes to.
/// Unknown fields, repeated keys or any other bytes the record type would
/// drop on decode make the successor malformed.
pub fn decode_single_successor<R: Serialize + DeserializeOwned>(successors: &[Payload]) -> ValidationResult<R> {
    match successors {
        [single] => {
            let record: R = single.decode().map_err(|e| {
                ValidationError::state_shape(format!("successor does not decode as the record type: {}", e))
            })?;
            let canonical = single.is_canonical_encoding_of(&record).map_err(|e| {
                ValidationError::state_shape(format!("successor does not re-encode: {}", e))
            })?;
            if !canonical {
                return Err(DiffViolation::SuccessorShapeInvalid(
                    "successor is not the canonical encoding of its record".into(),
                )
                .into());
            }
            Ok(record)
        }
        [] => Err(ValidationError::state_shape("transition produces no successor record")),
        many => Err(ValidationError::state_shape(format!(
            "transition produces {} successor records, expected exactly one",
            many.len()
        ))),
    }
}

/// Validate one proposed transition
pub fn validate<W: Workflow>(
    workflow: &W,
    old: Option<&W::Record>,
    action: &W::Action,
    ctx: &ValidationContext,
    successors: &[Payload],
) -> Verdict {
    debug!(
        workflow = W::NAME,
        ?action,
        bootstrap = old.is_none(),
        signers = ctx.signers.len(),
        successors = successors.len(),
        "validating transition"
    );

    let result = decode_single_successor::<W::Record>(successors)
        .and_then(|new| workflow.validate_transition(old, action, ctx, &new));

    match &result {
        Ok(()) => {
            let fingerprint = successors.first().map(Payload::fingerprint).unwrap_or_default();
            info!(workflow = W::NAME, ?action, successor = %fingerprint, "transition accepted");
        }
        Err(e) => {
            warn!(workflow = W::NAME, ?action, category = %e.category(), reason = %e, "transition rejected");
        }
    }

    Verdict::from(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{verify_transition, FieldPolicy, FieldRule};
    use crate::rejection::RejectCategory;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        owner: String,
        value: u64,
    }

    #[derive(Debug)]
    struct Increment;

    struct CounterWorkflow;

    impl Workflow for CounterWorkflow {
        type Record = Counter;
        type Action = Increment;

        const NAME: &'static str = "counter";

        fn validate_transition(
            &self,
            old: Option<&Counter>,
            _action: &Increment,
            ctx: &ValidationContext,
            new: &Counter,
        ) -> ValidationResult<()> {
            ctx.require_signer()?;
            let old = old.ok_or_else(|| ValidationError::precondition("counter must exist"))?;
            let policy = FieldPolicy::new().allow("value", FieldRule::ReplacedWith(json!(old.value + 1)));
            verify_transition(old, new, &policy)?;
            Ok(())
        }
    }

    fn counter(value: u64) -> Counter {
        Counter { owner: "coop".into(), value }
    }

    fn signed() -> ValidationContext {
        ValidationContext::new(["alice"].into_iter().collect(), 0)
    }

    #[test_log::test]
    fn test_single_successor_accepted() {
        let successors = vec![Payload::encode(&counter(2)).unwrap()];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &successors);
        assert!(verdict.is_accepted());
    }

    #[test_log::test]
    fn test_zero_or_many_successors_rejected() {
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &[]);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));

        let two = vec![
            Payload::encode(&counter(2)).unwrap(),
            Payload::encode(&counter(2)).unwrap(),
        ];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &two);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));
    }

    #[test_log::test]
    fn test_undecodable_successor_rejected() {
        let successors = vec![Payload::new(b"{\"owner\":1}".to_vec())];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &successors);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));
    }

    #[test_log::test]
    fn test_successor_with_unknown_field_rejected() {
        let successors = vec![Payload::new(br#"{"owner":"coop","value":2,"admin":"mallory"}"#.to_vec())];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &successors);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));
    }

    #[test_log::test]
    fn test_successor_with_repeated_key_rejected() {
        let successors = vec![Payload::new(br#"{"owner":"mallory","owner":"coop","value":2}"#.to_vec())];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &successors);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::StateShape));

        let canonical = vec![Payload::new(br#"{"owner":"coop","value":2}"#.to_vec())];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &canonical);
        assert!(verdict.is_accepted());
    }

    #[test_log::test]
    fn test_workflow_rejection_propagates() {
        let successors = vec![Payload::encode(&counter(3)).unwrap()];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &signed(), &successors);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Invariant));

        let unsigned = ValidationContext::default();
        let successors = vec![Payload::encode(&counter(2)).unwrap()];
        let verdict = validate(&CounterWorkflow, Some(&counter(1)), &Increment, &unsigned, &successors);
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Authorization));
    }
}
