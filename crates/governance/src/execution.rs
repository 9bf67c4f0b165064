//! Proposal execution checks
//!
//! Governance only marks a proposal as executed. What the proposal does is
//! carried out by the surrounding transaction against the treasury or the
//! membership registry, so the checks here are limited to whether that
//! collaborator is known and whether the executing party may act for it.

use tracing::debug;

use icn_common::{Identity, MembershipRegistry, ParamsAuthorization};
use icn_policy::{ValidationContext, ValidationError, ValidationResult};

use crate::{GovernanceRecord, Proposal, ProposalCategory};

/// A trait for category-specific execution checks
pub trait ProposalExecutor {
    /// Check that `proposal` may be executed against `record` in this transition
    fn check_execution(
        &self,
        proposal: &Proposal,
        record: &GovernanceRecord,
        ctx: &ValidationContext,
    ) -> ValidationResult<()>;
}

/// The signer acting with administrative authority.
///
/// Under `AnySigner` this is any authorizing identity; under `RegistryAdmin`
/// it is the first signer the registry lists as an admin.
pub fn authorize_privileged<'c, M: MembershipRegistry>(
    ctx: &'c ValidationContext,
    registry: &M,
    authorization: ParamsAuthorization,
) -> ValidationResult<&'c Identity> {
    let signer = ctx.require_signer()?;

    match authorization {
        ParamsAuthorization::AnySigner => Ok(signer),
        ParamsAuthorization::RegistryAdmin => ctx
            .signers
            .iter()
            .find(|identity| registry.is_admin(identity))
            .ok_or_else(|| ValidationError::authorization("no authorizing identity is a registry admin")),
    }
}

/// The default executor: checks by proposal category
#[derive(Debug)]
pub struct CategoryExecutor<'r, M> {
    registry: &'r M,
    authorization: ParamsAuthorization,
}

impl<'r, M: MembershipRegistry> CategoryExecutor<'r, M> {
    pub fn new(registry: &'r M, authorization: ParamsAuthorization) -> Self {
        Self { registry, authorization }
    }
}

impl<M: MembershipRegistry> ProposalExecutor for CategoryExecutor<'_, M> {
    fn check_execution(
        &self,
        proposal: &Proposal,
        record: &GovernanceRecord,
        ctx: &ValidationContext,
    ) -> ValidationResult<()> {
        match proposal.category {
            ProposalCategory::TreasuryAction => {
                let signer = authorize_privileged(ctx, self.registry, self.authorization)?;
                // Presence only; the treasury transition itself is validated separately
                if record.treasury.is_empty() {
                    return Err(ValidationError::precondition(
                        "treasury action proposal has no treasury to act on",
                    ));
                }
                debug!(%signer, treasury = %record.treasury, "treasury action execution authorized");
                Ok(())
            }
            ProposalCategory::MembershipChange => {
                let signer = authorize_privileged(ctx, self.registry, self.authorization)?;
                if record.entity.is_empty() {
                    return Err(ValidationError::precondition(
                        "membership change proposal has no membership record to act on",
                    ));
                }
                debug!(%signer, entity = %record.entity, "membership change execution authorized");
                Ok(())
            }
            ProposalCategory::ParameterChange | ProposalCategory::Other => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icn_common::{Payload, RecordRef, SignerSet, StaticMembership};
    use icn_policy::RejectCategory;

    use crate::GovernanceParams;

    fn record(treasury: &str) -> GovernanceRecord {
        GovernanceRecord {
            entity: RecordRef::new("membership#0"),
            treasury: RecordRef::new(treasury),
            params: GovernanceParams::default(),
            proposals: Vec::new(),
            next_proposal_id: 0,
        }
    }

    fn proposal(category: ProposalCategory) -> Proposal {
        Proposal::new("t".into(), "d".into(), category, Identity::new("alice"), 0, 10, Payload::default())
    }

    fn signed_by(names: &[&str]) -> ValidationContext {
        ValidationContext::new(names.iter().copied().collect::<SignerSet>(), 0)
    }

    #[test]
    fn test_treasury_action_needs_signer_and_handle() {
        let registry = StaticMembership::new();
        let executor = CategoryExecutor::new(&registry, ParamsAuthorization::AnySigner);
        let treasury_action = proposal(ProposalCategory::TreasuryAction);

        assert!(executor.check_execution(&treasury_action, &record("treasury#3"), &signed_by(&["bob"])).is_ok());

        let err = executor
            .check_execution(&treasury_action, &record("treasury#3"), &signed_by(&[]))
            .unwrap_err();
        assert_eq!(err.category(), RejectCategory::Authorization);

        let err = executor
            .check_execution(&treasury_action, &record(""), &signed_by(&["bob"]))
            .unwrap_err();
        assert_eq!(err.category(), RejectCategory::Precondition);
    }

    #[test]
    fn test_other_categories_need_nothing() {
        let registry = StaticMembership::new();
        let executor = CategoryExecutor::new(&registry, ParamsAuthorization::RegistryAdmin);

        for category in [ProposalCategory::ParameterChange, ProposalCategory::Other] {
            assert!(executor.check_execution(&proposal(category), &record(""), &signed_by(&[])).is_ok());
        }
    }

    #[test]
    fn test_registry_admin_authorization() {
        let registry = StaticMembership::new().with_admin("carol").with_member("bob");

        let admin_signers = signed_by(&["bob", "carol"]);
        let admin = authorize_privileged(&admin_signers, &registry, ParamsAuthorization::RegistryAdmin);
        assert_eq!(admin.unwrap(), &Identity::new("carol"));

        let err = authorize_privileged(&signed_by(&["bob"]), &registry, ParamsAuthorization::RegistryAdmin).unwrap_err();
        assert_eq!(err.category(), RejectCategory::Authorization);

        let any_signers = signed_by(&["bob"]);
        let anyone = authorize_privileged(&any_signers, &registry, ParamsAuthorization::AnySigner);
        assert_eq!(anyone.unwrap(), &Identity::new("bob"));
    }
}
