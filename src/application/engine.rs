use super::retry::RetryPolicy;
use crate::domain::fees::{FeeBreakdown, FeeSchedule};
use crate::domain::ledger::{EntryKind, LedgerEntry};
use crate::domain::money::{Amount, Currency, from_minor_units, to_minor_units};
use crate::domain::payment::{ChargeNotice, Payment, PaymentStatus};
use crate::domain::ports::{
    CheckoutRequest, LedgerStoreBox, PaymentGatewayBox, PaymentStoreBox, WalletStoreBox,
    WithdrawalStoreBox,
};
use crate::domain::wallet::Wallet;
use crate::domain::webhook::{EventKind, WebhookEvent, WebhookVerifier};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The storage backends the engine owns.
pub struct Stores {
    pub wallets: WalletStoreBox,
    pub payments: PaymentStoreBox,
    pub ledger: LedgerStoreBox,
    pub withdrawals: WithdrawalStoreBox,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub currency: Currency,
    pub fees: FeeSchedule,
    pub retry: RetryPolicy,
    /// Re-check successful charges with the provider before crediting.
    pub verify_with_gateway: bool,
    /// Used when an order does not carry its own callback URL.
    pub callback_url: Option<String>,
}

/// A request from the marketplace to pay for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub task_id: String,
    pub payer_id: String,
    pub payer_email: String,
    pub payee_id: String,
    /// Task price in major units, before fees.
    pub amount: Decimal,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl CheckoutOrder {
    fn validate(&self) -> Result<()> {
        let required = [
            ("task_id", &self.task_id),
            ("payer_id", &self.payer_id),
            ("payee_id", &self.payee_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PaymentError::ValidationError(format!("{name} is required")));
            }
        }
        if !self.payer_email.contains('@') {
            return Err(PaymentError::ValidationError(format!(
                "Invalid payer email: {:?}",
                self.payer_email
            )));
        }
        if self.payer_id == self.payee_id {
            return Err(PaymentError::ValidationError(
                "Payer and payee must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The payment settled and the payee wallet was credited.
    Credited {
        reference: String,
        owner: String,
        amount: Decimal,
    },
    /// The payment moved to a non-successful status.
    StatusUpdated {
        reference: String,
        status: PaymentStatus,
    },
    /// Nothing changed; the notice repeats what we already know.
    Duplicate {
        reference: String,
        status: PaymentStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WithdrawalOutcome {
    Completed {
        reference: String,
        owner: String,
        amount: Decimal,
    },
    Failed {
        reference: String,
        owner: String,
        amount: Decimal,
    },
    Duplicate {
        reference: String,
        status: WithdrawalStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Charge { result: SettlementOutcome },
    Withdrawal { result: WithdrawalOutcome },
    Ignored { event: String },
}

/// Drives a task payment from checkout to wallet credit.
///
/// Every operation that moves money runs under `settle_lock`, so concurrent
/// deliveries of the same webhook are applied one after the other and the
/// ledger idempotency check sees the first one's entry.
pub struct SettlementEngine {
    stores: Stores,
    gateway: PaymentGatewayBox,
    verifier: WebhookVerifier,
    config: EngineConfig,
    settle_lock: Mutex<()>,
}

impl SettlementEngine {
    /// Creates a new `SettlementEngine`.
    ///
    /// # Arguments
    ///
    /// * `stores` - Wallet, payment, ledger and withdrawal storage.
    /// * `gateway` - The payment provider adapter.
    /// * `verifier` - Checks webhook signatures.
    /// * `config` - Currency, fee schedule and retry policy.
    pub fn new(
        stores: Stores,
        gateway: PaymentGatewayBox,
        verifier: WebhookVerifier,
        config: EngineConfig,
    ) -> Self {
        Self {
            stores,
            gateway,
            verifier,
            config,
            settle_lock: Mutex::new(()),
        }
    }

    pub fn quote(&self, amount: Decimal) -> Result<FeeBreakdown> {
        Ok(self.config.fees.breakdown(Amount::new(amount)?))
    }

    /// Prices the order, records a pending payment and opens a hosted
    /// checkout session for it.
    ///
    /// If the provider cannot open the session the payment is marked failed
    /// and the error is returned.
    pub async fn initiate_checkout(&self, order: CheckoutOrder) -> Result<Payment> {
        order.validate()?;
        let breakdown = self.quote(order.amount)?;
        let amount = to_minor_units(breakdown.total)?;

        let mut payment = Payment::new(
            order.task_id,
            order.payer_id,
            order.payer_email,
            order.payee_id,
            self.config.currency.clone(),
            breakdown,
        );
        self.stores.payments.store(payment.clone()).await?;

        let request = CheckoutRequest {
            reference: payment.reference.clone(),
            email: payment.payer_email.clone(),
            amount,
            currency: payment.currency.clone(),
            callback_url: order.callback_url.or_else(|| self.config.callback_url.clone()),
            metadata: serde_json::json!({
                "task_id": payment.task_id,
                "payer_id": payment.payer_id,
                "payee_id": payment.payee_id,
            }),
        };

        let result = self
            .config
            .retry
            .run("initialize_checkout", || {
                self.gateway.initialize_checkout(&request)
            })
            .await;

        match result {
            Ok(session) => {
                if session.reference != payment.reference {
                    warn!(
                        reference = %payment.reference,
                        gateway_reference = %session.reference,
                        "Gateway echoed a different reference"
                    );
                }
                payment.checkout_url = Some(session.checkout_url);
                payment.updated_at = chrono::Utc::now();
                self.stores.payments.store(payment.clone()).await?;
                info!(
                    reference = %payment.reference,
                    task_id = %payment.task_id,
                    total = %payment.breakdown.total,
                    "Checkout session initialized"
                );
                Ok(payment)
            }
            Err(e) => {
                warn!(reference = %payment.reference, error = %e, "Checkout initialization failed");
                payment.set_status(PaymentStatus::Failed);
                self.stores.payments.store(payment).await?;
                Err(e)
            }
        }
    }

    /// Verifies and applies a provider callback.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome> {
        let Some(signature) = signature else {
            warn!("Webhook rejected: missing signature");
            return Err(PaymentError::InvalidSignature);
        };
        if !self.verifier.verify(payload, signature)? {
            warn!("Webhook rejected: signature mismatch");
            return Err(PaymentError::InvalidSignature);
        }

        let event = WebhookEvent::parse(payload)?;
        match event.kind() {
            EventKind::ChargeSucceeded | EventKind::ChargeFailed => {
                let notice = event.charge_notice()?.ok_or_else(|| {
                    PaymentError::MalformedPayload(format!("{} carries no charge", event.event))
                })?;
                let result = self.apply_charge(notice).await?;
                Ok(WebhookOutcome::Charge { result })
            }
            EventKind::TransferSucceeded => {
                let result = self.complete_withdrawal(&event.data()?.reference).await?;
                Ok(WebhookOutcome::Withdrawal { result })
            }
            EventKind::TransferFailed => {
                let result = self.fail_withdrawal(&event.data()?.reference).await?;
                Ok(WebhookOutcome::Withdrawal { result })
            }
            EventKind::Other(name) => {
                info!(event = %name, "Ignoring unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event: name })
            }
        }
    }

    /// Applies a charge outcome reported by a webhook.
    pub async fn apply_charge(&self, notice: ChargeNotice) -> Result<SettlementOutcome> {
        self.apply_notice(notice, false).await
    }

    /// Asks the provider for the charge's status and applies it. Used when
    /// the payer is redirected back before the webhook arrives.
    ///
    /// Only references of stored payments are sent to the provider.
    pub async fn verify_payment(&self, reference: &str) -> Result<SettlementOutcome> {
        let payment = self.payment(reference).await?;
        let verification = self
            .config
            .retry
            .run("verify", || self.gateway.verify(&payment.reference))
            .await?;
        if verification.reference != payment.reference {
            return Err(PaymentError::VerificationFailed {
                reference: payment.reference,
                reason: format!("provider answered for {}", verification.reference),
            });
        }
        let notice = ChargeNotice {
            reference: payment.reference,
            status: verification.status,
            amount_minor: Some(verification.amount_minor),
            currency: Some(verification.currency),
            gateway_id: verification.gateway_id,
        };
        self.apply_notice(notice, true).await
    }

    async fn apply_notice(
        &self,
        notice: ChargeNotice,
        verified: bool,
    ) -> Result<SettlementOutcome> {
        let _guard = self.settle_lock.lock().await;

        let mut payment = self
            .stores
            .payments
            .get(&notice.reference)
            .await?
            .ok_or_else(|| PaymentError::UnknownReference(notice.reference.clone()))?;

        if notice.status == payment.status || notice.status == PaymentStatus::Pending {
            info!(
                reference = %payment.reference,
                status = %payment.status,
                reported = %notice.status,
                "Charge notice changes nothing"
            );
            return Ok(SettlementOutcome::Duplicate {
                reference: payment.reference,
                status: payment.status,
            });
        }

        if !payment.status.can_transition_to(notice.status) {
            warn!(
                reference = %payment.reference,
                from = %payment.status,
                to = %notice.status,
                "Rejected payment status transition"
            );
            return Err(PaymentError::InvalidTransition {
                reference: payment.reference,
                from: payment.status.to_string(),
                to: notice.status.to_string(),
            });
        }

        if let Some(id) = notice.gateway_id {
            payment.gateway_id = Some(id);
        }

        if notice.status != PaymentStatus::Successful {
            payment.set_status(notice.status);
            self.stores.payments.store(payment.clone()).await?;
            info!(
                reference = %payment.reference,
                status = %payment.status,
                "Payment status updated"
            );
            return Ok(SettlementOutcome::StatusUpdated {
                reference: payment.reference,
                status: payment.status,
            });
        }

        let mut amount_checked = false;
        if let Some(amount) = notice.amount_minor {
            self.check_charge(&payment, amount, notice.currency.as_ref())?;
            amount_checked = true;
        }
        if self.config.verify_with_gateway && !verified {
            let verification = self
                .config
                .retry
                .run("verify", || self.gateway.verify(&payment.reference))
                .await?;
            if verification.status != PaymentStatus::Successful {
                return Err(PaymentError::VerificationFailed {
                    reference: payment.reference,
                    reason: format!("gateway reports {}", verification.status),
                });
            }
            self.check_charge(&payment, verification.amount_minor, Some(&verification.currency))?;
            payment.gateway_id = payment.gateway_id.or(verification.gateway_id);
            amount_checked = true;
        }
        if !amount_checked {
            return Err(PaymentError::VerificationFailed {
                reference: payment.reference,
                reason: "charged amount not reported".to_string(),
            });
        }

        let credited = self.credit_payee(&payment).await?;
        payment.set_status(PaymentStatus::Successful);
        self.stores.payments.store(payment.clone()).await?;

        Ok(SettlementOutcome::Credited {
            reference: payment.reference,
            owner: payment.payee_id,
            amount: credited,
        })
    }

    fn check_charge(
        &self,
        payment: &Payment,
        amount_minor: i64,
        currency: Option<&Currency>,
    ) -> Result<()> {
        let expected = to_minor_units(payment.breakdown.total)?;
        if amount_minor != expected {
            warn!(
                reference = %payment.reference,
                expected,
                actual = amount_minor,
                "Charged amount does not match payment total"
            );
            return Err(PaymentError::AmountMismatch {
                reference: payment.reference.clone(),
                expected: payment.breakdown.total.to_string(),
                actual: from_minor_units(amount_minor).to_string(),
            });
        }
        if let Some(currency) = currency
            && *currency != payment.currency
        {
            return Err(PaymentError::AmountMismatch {
                reference: payment.reference.clone(),
                expected: payment.currency.to_string(),
                actual: currency.to_string(),
            });
        }
        Ok(())
    }

    /// Credits the tasker payout once per payment reference.
    async fn credit_payee(&self, payment: &Payment) -> Result<Decimal> {
        let payout = payment.breakdown.tasker_payout;
        let entry_id = LedgerEntry::entry_id(EntryKind::Credit, &payment.reference);
        if self.stores.ledger.exists(&entry_id).await? {
            info!(reference = %payment.reference, "Payment already credited, skipping");
            return Ok(payout);
        }
        let Ok(amount) = Amount::new(payout) else {
            warn!(reference = %payment.reference, %payout, "Nothing to credit for payment");
            return Ok(Decimal::ZERO);
        };

        let mut wallet = self
            .stores
            .wallets
            .get(&payment.payee_id)
            .await?
            .unwrap_or_else(|| Wallet::new(payment.payee_id.clone(), payment.currency.clone()));
        if wallet.currency != payment.currency {
            return Err(PaymentError::ValidationError(format!(
                "Wallet {} holds {}, payment is in {}",
                wallet.owner, wallet.currency, payment.currency
            )));
        }

        wallet.credit(amount.into());
        let entry = LedgerEntry::new(
            EntryKind::Credit,
            wallet.owner.clone(),
            amount,
            payment.reference.clone(),
            wallet.available,
        );
        if !self.stores.ledger.post(entry, wallet).await? {
            info!(reference = %payment.reference, "Payment already credited, skipping");
            return Ok(payout);
        }
        info!(
            reference = %payment.reference,
            owner = %payment.payee_id,
            amount = %amount,
            "Wallet credited"
        );
        Ok(payout)
    }

    /// Reserves funds in the owner's wallet for a payout.
    pub async fn request_withdrawal(&self, owner: &str, amount: Decimal) -> Result<Withdrawal> {
        let amount = Amount::new(amount)?;
        let _guard = self.settle_lock.lock().await;

        let mut wallet = self
            .stores
            .wallets
            .get(owner)
            .await?
            .ok_or_else(|| PaymentError::WalletNotFound(owner.to_string()))?;
        wallet.reserve(amount.into())?;

        let withdrawal = Withdrawal::new(owner, amount, wallet.currency.clone());
        let entry = LedgerEntry::new(
            EntryKind::Reserve,
            owner,
            amount,
            withdrawal.reference.clone(),
            wallet.available,
        );
        self.stores.ledger.post(entry, wallet).await?;
        self.stores.withdrawals.store(withdrawal.clone()).await?;
        info!(reference = %withdrawal.reference, owner, amount = %amount, "Withdrawal requested");
        Ok(withdrawal)
    }

    pub async fn complete_withdrawal(&self, reference: &str) -> Result<WithdrawalOutcome> {
        self.finish_withdrawal(reference, WithdrawalStatus::Completed)
            .await
    }

    pub async fn fail_withdrawal(&self, reference: &str) -> Result<WithdrawalOutcome> {
        self.finish_withdrawal(reference, WithdrawalStatus::Failed)
            .await
    }

    async fn finish_withdrawal(
        &self,
        reference: &str,
        target: WithdrawalStatus,
    ) -> Result<WithdrawalOutcome> {
        let _guard = self.settle_lock.lock().await;

        let mut withdrawal = self
            .stores
            .withdrawals
            .get(reference)
            .await?
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))?;

        if withdrawal.status == target {
            return Ok(WithdrawalOutcome::Duplicate {
                reference: withdrawal.reference,
                status: withdrawal.status,
            });
        }
        if !withdrawal.is_pending() {
            return Err(PaymentError::InvalidTransition {
                reference: withdrawal.reference,
                from: withdrawal.status.to_string(),
                to: target.to_string(),
            });
        }

        let kind = if target == WithdrawalStatus::Completed {
            EntryKind::Debit
        } else {
            EntryKind::Release
        };
        if !self
            .stores
            .ledger
            .exists(&LedgerEntry::entry_id(kind, reference))
            .await?
        {
            let mut wallet = self
                .stores
                .wallets
                .get(&withdrawal.owner)
                .await?
                .ok_or_else(|| PaymentError::WalletNotFound(withdrawal.owner.clone()))?;
            match kind {
                EntryKind::Debit => wallet.debit_reserved(withdrawal.amount.into())?,
                _ => wallet.release(withdrawal.amount.into())?,
            }
            let entry = LedgerEntry::new(
                kind,
                withdrawal.owner.clone(),
                withdrawal.amount,
                reference,
                wallet.available,
            );
            self.stores.ledger.post(entry, wallet).await?;
        }

        withdrawal.set_status(target);
        self.stores.withdrawals.store(withdrawal.clone()).await?;
        info!(reference, status = %target, "Withdrawal finished");

        let (reference, owner, amount) = (
            withdrawal.reference,
            withdrawal.owner,
            withdrawal.amount.value(),
        );
        Ok(match target {
            WithdrawalStatus::Completed => WithdrawalOutcome::Completed {
                reference,
                owner,
                amount,
            },
            _ => WithdrawalOutcome::Failed {
                reference,
                owner,
                amount,
            },
        })
    }

    pub async fn payment(&self, reference: &str) -> Result<Payment> {
        self.stores
            .payments
            .get(reference)
            .await?
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))
    }

    pub async fn withdrawal(&self, reference: &str) -> Result<Withdrawal> {
        self.stores
            .withdrawals
            .get(reference)
            .await?
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))
    }

    pub async fn wallet(&self, owner: &str) -> Result<Wallet> {
        self.stores
            .wallets
            .get(owner)
            .await?
            .ok_or_else(|| PaymentError::WalletNotFound(owner.to_string()))
    }

    /// Freezing blocks withdrawals; settled payments are still credited.
    pub async fn set_wallet_frozen(&self, owner: &str, frozen: bool) -> Result<Wallet> {
        let _guard = self.settle_lock.lock().await;
        let mut wallet = self.wallet(owner).await?;
        if frozen {
            wallet.freeze();
        } else {
            wallet.unfreeze();
        }
        self.stores.wallets.store(wallet.clone()).await?;
        info!(owner, frozen, "Wallet status changed");
        Ok(wallet)
    }

    pub async fn wallets(&self) -> Result<Vec<Wallet>> {
        self.stores.wallets.get_all().await
    }

    pub async fn ledger(&self, owner: &str) -> Result<Vec<LedgerEntry>> {
        self.stores.ledger.entries_for(owner).await
    }
}
