use super::money::{Amount, Currency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A payout request against a wallet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Withdrawal {
    pub reference: String,
    pub owner: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(owner: impl Into<String>, amount: Amount, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            reference: format!("wd_{}", Uuid::new_v4().simple()),
            owner: owner.into(),
            amount,
            currency,
            status: WithdrawalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    pub fn set_status(&mut self, status: WithdrawalStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
