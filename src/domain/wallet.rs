use super::money::{Balance, Currency};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Frozen,
}

/// A user's balance record.
///
/// Tracks available funds, funds held for pending withdrawals, and the total.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    /// The user owning this wallet.
    pub owner: String,
    pub currency: Currency,
    /// Funds that can be withdrawn.
    pub available: Balance,
    /// Funds reserved by pending withdrawals.
    pub held: Balance,
    /// Total funds (available + held).
    pub total: Balance,
    pub status: WalletStatus,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner: impl Into<String>, currency: Currency) -> Self {
        Self {
            owner: owner.into(),
            currency,
            available: Balance::ZERO,
            held: Balance::ZERO,
            total: Balance::ZERO,
            status: WalletStatus::Active,
            updated_at: Utc::now(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.status == WalletStatus::Frozen
    }

    pub fn freeze(&mut self) {
        self.status = WalletStatus::Frozen;
        self.touch();
    }

    pub fn unfreeze(&mut self) {
        self.status = WalletStatus::Active;
        self.touch();
    }

    /// Credits settled funds. Frozen wallets still accept credits.
    pub fn credit(&mut self, amount: Balance) {
        self.available += amount;
        self.total += amount;
        self.touch();
    }

    /// Reserves funds for a withdrawal (moves from available to held)
    pub fn reserve(&mut self, amount: Balance) -> Result<(), PaymentError> {
        if self.is_frozen() {
            return Err(PaymentError::WalletFrozen(self.owner.clone()));
        }
        if self.available < amount {
            return Err(PaymentError::InsufficientFunds(self.owner.clone()));
        }
        self.available -= amount;
        self.held += amount;
        self.touch();
        Ok(())
    }

    /// Returns reserved funds to available after a failed withdrawal
    pub fn release(&mut self, amount: Balance) -> Result<(), PaymentError> {
        if self.held < amount {
            return Err(PaymentError::ValidationError(
                "Held funds mismatch".to_string(),
            ));
        }
        self.held -= amount;
        self.available += amount;
        self.touch();
        Ok(())
    }

    /// Removes reserved funds once a withdrawal has been paid out
    pub fn debit_reserved(&mut self, amount: Balance) -> Result<(), PaymentError> {
        if self.held < amount {
            return Err(PaymentError::ValidationError(
                "Held funds mismatch".to_string(),
            ));
        }
        self.held -= amount;
        self.total -= amount;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
