use crate::application::engine::Stores;
use crate::domain::ledger::LedgerEntry;
use crate::domain::payment::Payment;
use crate::domain::ports::{LedgerStore, PaymentStore, WalletStore, WithdrawalStore};
use crate::domain::wallet::Wallet;
use crate::domain::withdrawal::Withdrawal;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for wallet states.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for payments, keyed by reference.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for ledger entries, keyed by owner then time.
pub const CF_LEDGER: &str = "ledger";
/// Column Family mapping ledger entry ids to their `CF_LEDGER` keys.
pub const CF_LEDGER_IDS: &str = "ledger_ids";
/// Column Family for withdrawals, keyed by reference.
pub const CF_WITHDRAWALS: &str = "withdrawals";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_WALLETS,
    CF_PAYMENTS,
    CF_LEDGER,
    CF_LEDGER_IDS,
    CF_WITHDRAWALS,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own Column Family as JSON. This struct is
/// thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// One shared database behind every store the engine needs.
    pub fn stores(self) -> Stores {
        Stores {
            wallets: Box::new(self.clone()),
            payments: Box::new(self.clone()),
            ledger: Box::new(self.clone()),
            withdrawals: Box::new(self),
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn ledger_key(entry: &LedgerEntry) -> Vec<u8> {
        let nanos = entry.created_at.timestamp_nanos_opt().unwrap_or_default();
        format!("{}\0{:020}\0{}", entry.owner, nanos, entry.id).into_bytes()
    }
}

#[async_trait]
impl WalletStore for RocksDBStore {
    async fn store(&self, wallet: Wallet) -> Result<()> {
        self.put_json(CF_WALLETS, wallet.owner.as_bytes(), &wallet)
    }

    async fn get(&self, owner: &str) -> Result<Option<Wallet>> {
        self.get_json(CF_WALLETS, owner.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        let cf = self.cf(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            wallets.push(serde_json::from_slice(&value)?);
        }
        Ok(wallets)
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn store(&self, payment: Payment) -> Result<()> {
        self.put_json(CF_PAYMENTS, payment.reference.as_bytes(), &payment)
    }

    async fn get(&self, reference: &str) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, reference.as_bytes())
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn post(&self, entry: LedgerEntry, wallet: Wallet) -> Result<bool> {
        if LedgerStore::exists(self, &entry.id).await? {
            return Ok(false);
        }
        let wallets = self.cf(CF_WALLETS)?;
        let ledger = self.cf(CF_LEDGER)?;
        let ids = self.cf(CF_LEDGER_IDS)?;
        let key = Self::ledger_key(&entry);

        // Wallet, entry and id index land together or not at all.
        let mut batch = WriteBatch::default();
        batch.put_cf(wallets, wallet.owner.as_bytes(), serde_json::to_vec(&wallet)?);
        batch.put_cf(ledger, &key, serde_json::to_vec(&entry)?);
        batch.put_cf(ids, entry.id.as_bytes(), &key);
        self.db.write(batch)?;
        Ok(true)
    }

    async fn exists(&self, entry_id: &str) -> Result<bool> {
        let cf = self.cf(CF_LEDGER_IDS)?;
        Ok(self.db.get_pinned_cf(cf, entry_id.as_bytes())?.is_some())
    }

    async fn entries_for(&self, owner: &str) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_LEDGER)?;
        let prefix = format!("{owner}\0").into_bytes();
        let mut entries = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_slice(), Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl WithdrawalStore for RocksDBStore {
    async fn store(&self, withdrawal: Withdrawal) -> Result<()> {
        self.put_json(CF_WITHDRAWALS, withdrawal.reference.as_bytes(), &withdrawal)
    }

    async fn get(&self, reference: &str) -> Result<Option<Withdrawal>> {
        self.get_json(CF_WITHDRAWALS, reference.as_bytes())
    }
}
