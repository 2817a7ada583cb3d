use super::money::{Amount, Balance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Settled payment credited to the payee.
    Credit,
    /// Funds moved to held for a withdrawal.
    Reserve,
    /// Held funds returned after a failed withdrawal.
    Release,
    /// Held funds paid out.
    Debit,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Credit => "credit",
            EntryKind::Reserve => "reserve",
            EntryKind::Release => "release",
            EntryKind::Debit => "debit",
        };
        f.write_str(s)
    }
}

/// One immutable movement on a wallet.
///
/// The `id` doubles as the idempotency key: a given kind of movement can be
/// applied at most once per payment or withdrawal reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LedgerEntry {
    pub id: String,
    pub owner: String,
    pub kind: EntryKind,
    pub amount: Amount,
    pub reference: String,
    pub available_after: Balance,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn entry_id(kind: EntryKind, reference: &str) -> String {
        format!("{kind}:{reference}")
    }

    pub fn new(
        kind: EntryKind,
        owner: impl Into<String>,
        amount: Amount,
        reference: impl Into<String>,
        available_after: Balance,
    ) -> Self {
        let reference = reference.into();
        Self {
            id: Self::entry_id(kind, &reference),
            owner: owner.into(),
            kind,
            amount,
            reference,
            available_after,
            created_at: Utc::now(),
        }
    }
}
