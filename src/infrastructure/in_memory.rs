use crate::application::engine::Stores;
use crate::domain::ledger::LedgerEntry;
use crate::domain::payment::Payment;
use crate::domain::ports::{LedgerStore, PaymentStore, WalletStore, WithdrawalStore};
use crate::domain::wallet::Wallet;
use crate::domain::withdrawal::Withdrawal;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for wallets.
///
/// Uses `Arc<RwLock<HashMap<String, Wallet>>>` to allow shared concurrent access.
/// Ideal for testing or small deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<String, Wallet>>>,
}

impl InMemoryWalletStore {
    /// Creates a new, empty in-memory wallet store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn store(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        wallets.insert(wallet.owner.clone(), wallet);
        Ok(())
    }

    async fn get(&self, owner: &str) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(owner).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        let mut all: Vec<Wallet> = wallets.values().cloned().collect();
        all.sort_by(|a, b| a.owner.cmp(&b.owner));
        Ok(all)
    }
}

/// A thread-safe in-memory store for payments, keyed by reference.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.reference.clone(), payment);
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(reference).cloned())
    }
}

/// An append-only in-memory ledger.
///
/// Entries are kept in insertion order; a side index by id answers the
/// idempotency check without scanning. Posting holds the ledger lock while
/// the wallet is written, so readers never see one without the other.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<LedgerState>>,
    wallets: InMemoryWalletStore,
}

#[derive(Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    ids: HashMap<String, usize>,
}

impl InMemoryLedgerStore {
    /// A ledger posting balances into `wallets`.
    pub fn new(wallets: InMemoryWalletStore) -> Self {
        Self {
            inner: Arc::default(),
            wallets,
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn post(&self, entry: LedgerEntry, wallet: Wallet) -> Result<bool> {
        let mut state = self.inner.write().await;
        if state.ids.contains_key(&entry.id) {
            return Ok(false);
        }
        self.wallets.store(wallet).await?;
        let position = state.entries.len();
        state.ids.insert(entry.id.clone(), position);
        state.entries.push(entry);
        Ok(true)
    }

    async fn exists(&self, entry_id: &str) -> Result<bool> {
        let state = self.inner.read().await;
        Ok(state.ids.contains_key(entry_id))
    }

    async fn entries_for(&self, owner: &str) -> Result<Vec<LedgerEntry>> {
        let state = self.inner.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect())
    }
}

/// A thread-safe in-memory store for withdrawals, keyed by reference.
#[derive(Default, Clone)]
pub struct InMemoryWithdrawalStore {
    withdrawals: Arc<RwLock<HashMap<String, Withdrawal>>>,
}

impl InMemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalStore for InMemoryWithdrawalStore {
    async fn store(&self, withdrawal: Withdrawal) -> Result<()> {
        let mut withdrawals = self.withdrawals.write().await;
        withdrawals.insert(withdrawal.reference.clone(), withdrawal);
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<Withdrawal>> {
        let withdrawals = self.withdrawals.read().await;
        Ok(withdrawals.get(reference).cloned())
    }
}

/// A fresh set of in-memory stores for the settlement engine.
pub fn in_memory_stores() -> Stores {
    let wallets = InMemoryWalletStore::new();
    Stores {
        ledger: Box::new(InMemoryLedgerStore::new(wallets.clone())),
        wallets: Box::new(wallets),
        payments: Box::new(InMemoryPaymentStore::new()),
        withdrawals: Box::new(InMemoryWithdrawalStore::new()),
    }
}
