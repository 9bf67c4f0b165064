//! Treasury record types

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use icn_common::{Identity, RecordRef};

/// Field names as they appear in a serialized [`TreasuryRecord`]
pub mod fields {
    pub const ENTITY: &str = "entity";
    pub const BALANCE: &str = "balance";
    pub const TRANSACTION_HISTORY: &str = "transaction_history";
    pub const PENDING_TRANSACTIONS: &str = "pending_transactions";
    pub const APPROVAL_THRESHOLDS: &str = "approval_thresholds";
    pub const APPROVALS: &str = "approvals";
}

/// Kinds of treasury transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Funds paid in by a member
    Contribution,
    /// Funds paid out to a member or supplier
    Transfer,
    /// Funds lent to a member
    Loan,
    /// Operating fee paid by the cooperative
    Fee,
    /// Surplus distributed to members
    Distribution,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Contribution => "Contribution",
            TransactionType::Transfer => "Transfer",
            TransactionType::Loan => "Loan",
            TransactionType::Fee => "Fee",
            TransactionType::Distribution => "Distribution",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable entry of the treasury history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The type of transaction
    pub tx_type: TransactionType,
    /// Amount moved; always positive
    pub amount: u64,
    /// The member who contributed or proposed it
    pub member: Identity,
    /// When it was recorded
    pub time: u64,
    /// Human-readable purpose
    pub description: String,
}

impl TransactionRecord {
    pub fn new(
        tx_type: TransactionType,
        amount: u64,
        member: impl Into<Identity>,
        time: u64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tx_type,
            amount,
            member: member.into(),
            time,
            description: description.into(),
        }
    }
}

/// A proposed outgoing transaction awaiting approvals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub transaction_record: TransactionRecord,
    /// Identities that approved so far
    pub approvals: BTreeSet<Identity>,
    pub required_approvals: u32,
}

impl PendingTransaction {
    /// A freshly proposed entry with no approvals
    pub fn proposed(transaction_record: TransactionRecord, required_approvals: u32) -> Self {
        Self {
            transaction_record,
            approvals: BTreeSet::new(),
            required_approvals,
        }
    }

    pub fn has_approved(&self, identity: &Identity) -> bool {
        self.approvals.contains(identity)
    }

    pub fn is_executable(&self) -> bool {
        icn_policy::approvals_sufficient(self.approvals.len(), self.required_approvals)
    }
}

/// The pooled treasury of a cooperative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryRecord {
    /// Handle to the membership record this treasury belongs to
    pub entity: RecordRef,
    /// Advisory asset quantities; conservation is enforced by the ledger
    pub balance: BTreeMap<String, u64>,
    /// Append-only history of completed transactions
    pub transaction_history: Vec<TransactionRecord>,
    pub pending_transactions: Vec<PendingTransaction>,
    /// Required approval count per transaction type
    pub approval_thresholds: BTreeMap<TransactionType, u32>,
}

impl TreasuryRecord {
    /// The record created by a bootstrap contribution
    pub fn bootstrap(
        entity: RecordRef,
        approval_thresholds: BTreeMap<TransactionType, u32>,
        first_contribution: TransactionRecord,
    ) -> Self {
        Self {
            entity,
            balance: BTreeMap::new(),
            transaction_history: vec![first_contribution],
            pending_transactions: Vec::new(),
            approval_thresholds,
        }
    }

    pub fn pending(&self, index: usize) -> Option<&PendingTransaction> {
        self.pending_transactions.get(index)
    }

    /// Approvals a new proposal of this type needs
    pub fn required_approvals_for(&self, tx_type: TransactionType, default: u32) -> u32 {
        self.approval_thresholds.get(&tx_type).copied().unwrap_or(default)
    }

    /// Pending list with the entry at `index` removed, order of the rest preserved
    pub fn pending_without(&self, index: usize) -> Vec<PendingTransaction> {
        self.pending_transactions
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn treasury() -> TreasuryRecord {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(TransactionType::Loan, 3);

        let mut record = TreasuryRecord::bootstrap(
            RecordRef::new("membership#0"),
            thresholds,
            TransactionRecord::new(TransactionType::Contribution, 100, "alice", 1, "seed"),
        );
        for (i, member) in ["alice", "bob", "carol"].iter().enumerate() {
            record.pending_transactions.push(PendingTransaction::proposed(
                TransactionRecord::new(TransactionType::Transfer, 10 + i as u64, *member, 2, "pay"),
                2,
            ));
        }
        record
    }

    #[test]
    fn test_required_approvals_lookup() {
        let record = treasury();
        assert_eq!(record.required_approvals_for(TransactionType::Loan, 2), 3);
        assert_eq!(record.required_approvals_for(TransactionType::Fee, 2), 2);
    }

    #[test]
    fn test_pending_without_preserves_order() {
        let record = treasury();
        let remaining = record.pending_without(1);
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].transaction_record.member, Identity::new("alice"));
        assert_eq!(remaining[1].transaction_record.member, Identity::new("carol"));
    }

    #[test]
    fn test_thresholds_serialize_as_map() {
        let record = treasury();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value[fields::APPROVAL_THRESHOLDS]["Loan"], 3);

        let back: TreasuryRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_executable() {
        let mut entry = treasury().pending_transactions[0].clone();
        assert!(!entry.is_executable());
        entry.approvals.insert(Identity::new("bob"));
        entry.approvals.insert(Identity::new("carol"));
        assert!(entry.is_executable());
    }
}
