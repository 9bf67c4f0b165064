//! Rejection reasons
//!
//! Every failure collapses to a single reject at the boundary, but the reason
//! is kept so callers and tests can tell conditions apart.

use std::fmt;

use thiserror::Error;

/// Outcome of comparing an old record with a candidate successor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffViolation {
    /// A field outside the whitelist differs, or a whitelisted value differs from what was required
    #[error("field '{0}' changed unexpectedly")]
    FieldUnexpectedlyChanged(String),

    /// A sequence grew or shrank by the wrong amount
    #[error("sequence '{field}' has length {actual}, expected {expected}")]
    SequenceLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// A sequence element differs at a position that had to match
    #[error("sequence '{field}' differs at index {index}")]
    ElementMismatch { field: String, index: usize },

    /// The successor is not a record of the expected shape
    #[error("successor shape invalid: {0}")]
    SuccessorShapeInvalid(String),
}

/// Coarse classification of a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectCategory {
    Authorization,
    StateShape,
    Invariant,
    Precondition,
}

impl fmt::Display for RejectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectCategory::Authorization => "authorization",
            RejectCategory::StateShape => "state shape",
            RejectCategory::Invariant => "invariant",
            RejectCategory::Precondition => "precondition",
        };
        write!(f, "{}", name)
    }
}

/// Why a transition was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Missing or insufficient authorizing identity
    #[error("Authorization failure: {0}")]
    Authorization(String),

    /// Wrong successor count, undecodable payload, or malformed record
    #[error("State shape failure: {0}")]
    StateShape(String),

    /// A field changed that must not, or changed the wrong way
    #[error("Invariant violation: {0}")]
    Invariant(DiffViolation),

    /// Out-of-range index, duplicate approval or vote, threshold not met, bad value
    #[error("Precondition failure: {0}")]
    Precondition(String),
}

impl ValidationError {
    pub fn authorization<S: Into<String>>(msg: S) -> Self {
        ValidationError::Authorization(msg.into())
    }

    pub fn state_shape<S: Into<String>>(msg: S) -> Self {
        ValidationError::StateShape(msg.into())
    }

    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        ValidationError::Precondition(msg.into())
    }

    pub fn category(&self) -> RejectCategory {
        match self {
            ValidationError::Authorization(_) => RejectCategory::Authorization,
            ValidationError::StateShape(_) => RejectCategory::StateShape,
            ValidationError::Invariant(_) => RejectCategory::Invariant,
            ValidationError::Precondition(_) => RejectCategory::Precondition,
        }
    }

    /// The structural diff violation, if this rejection carries one
    pub fn violation(&self) -> Option<&DiffViolation> {
        match self {
            ValidationError::Invariant(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<DiffViolation> for ValidationError {
    fn from(violation: DiffViolation) -> Self {
        match violation {
            DiffViolation::SuccessorShapeInvalid(reason) => ValidationError::StateShape(reason),
            other => ValidationError::Invariant(other),
        }
    }
}

impl From<icn_common::Error> for ValidationError {
    fn from(err: icn_common::Error) -> Self {
        ValidationError::StateShape(err.to_string())
    }
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Boundary outcome of a validation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(ValidationError),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    /// The rejection reason, if rejected
    pub fn reason(&self) -> Option<&ValidationError> {
        match self {
            Verdict::Accept => None,
            Verdict::Reject(reason) => Some(reason),
        }
    }
}

impl From<ValidationResult<()>> for Verdict {
    fn from(result: ValidationResult<()>) -> Self {
        match result {
            Ok(()) => Verdict::Accept,
            Err(e) => Verdict::Reject(e),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => write!(f, "ACCEPT"),
            Verdict::Reject(reason) => write!(f, "REJECT: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_violation_maps_to_state_shape() {
        let err: ValidationError = DiffViolation::SuccessorShapeInvalid("not a record".into()).into();
        assert_eq!(err.category(), RejectCategory::StateShape);
        assert!(err.violation().is_none());
    }

    #[test]
    fn test_diff_violation_maps_to_invariant() {
        let err: ValidationError = DiffViolation::ElementMismatch {
            field: "transaction_history".into(),
            index: 3,
        }
        .into();
        assert_eq!(err.category(), RejectCategory::Invariant);
        assert_eq!(
            err.to_string(),
            "Invariant violation: sequence 'transaction_history' differs at index 3"
        );
    }

    #[test]
    fn test_verdict_from_result() {
        assert!(Verdict::from(Ok(())).is_accepted());

        let verdict = Verdict::from(Err(ValidationError::authorization("no signer")));
        assert!(!verdict.is_accepted());
        assert_eq!(verdict.reason().map(|r| r.category()), Some(RejectCategory::Authorization));
        assert_eq!(verdict.to_string(), "REJECT: Authorization failure: no signer");
    }
}
