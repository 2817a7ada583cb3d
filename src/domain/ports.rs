use super::ledger::LedgerEntry;
use super::money::Currency;
use super::payment::{Payment, PaymentStatus};
use super::wallet::Wallet;
use super::withdrawal::Withdrawal;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn store(&self, wallet: Wallet) -> Result<()>;
    async fn get(&self, owner: &str) -> Result<Option<Wallet>>;
    async fn get_all(&self) -> Result<Vec<Wallet>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, payment: Payment) -> Result<()>;
    async fn get(&self, reference: &str) -> Result<Option<Payment>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Records `entry` together with the wallet state it produced. Both are
    /// written or neither is. Returns `false` without writing anything if an
    /// entry with the same id already exists.
    async fn post(&self, entry: LedgerEntry, wallet: Wallet) -> Result<bool>;
    async fn exists(&self, entry_id: &str) -> Result<bool>;
    /// Entries for one wallet, oldest first.
    async fn entries_for(&self, owner: &str) -> Result<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn store(&self, withdrawal: Withdrawal) -> Result<()>;
    async fn get(&self, reference: &str) -> Result<Option<Withdrawal>>;
}

/// What we send the provider to open a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub reference: String,
    pub email: String,
    /// Minor units.
    pub amount: i64,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub reference: String,
    #[serde(rename = "authorization_url")]
    pub checkout_url: String,
    #[serde(default)]
    pub access_code: Option<String>,
}

/// The provider's authoritative view of a charge.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayVerification {
    pub reference: String,
    pub status: PaymentStatus,
    pub amount_minor: i64,
    pub currency: Currency,
    pub gateway_id: Option<u64>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
    async fn verify(&self, reference: &str) -> Result<GatewayVerification>;
}

pub type WalletStoreBox = Box<dyn WalletStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type WithdrawalStoreBox = Box<dyn WithdrawalStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
