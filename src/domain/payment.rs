use super::fees::FeeBreakdown;
use super::money::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Successful,
    Failed,
    Abandoned,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Successful | PaymentStatus::Failed)
    }

    /// Whether a payment in `self` may move to `next`.
    ///
    /// An abandoned checkout can still complete: the payer may come back to
    /// the hosted page with the same reference.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Successful | Failed | Abandoned) | (Abandoned, Successful | Failed)
        )
    }

    /// Maps a provider-reported charge status onto ours.
    pub fn from_gateway(status: &str) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "success" | "successful" => Some(PaymentStatus::Successful),
            "failed" | "reversed" => Some(PaymentStatus::Failed),
            "abandoned" | "cancelled" => Some(PaymentStatus::Abandoned),
            "pending" | "ongoing" | "processing" | "queued" => Some(PaymentStatus::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Successful => "successful",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// A checkout for one task, from creation until the provider reports a
/// final status.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub reference: String,
    pub task_id: String,
    pub payer_id: String,
    pub payer_email: String,
    /// The tasker whose wallet is credited on settlement.
    pub payee_id: String,
    pub currency: Currency,
    pub breakdown: FeeBreakdown,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub gateway_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// A provider's claim about the outcome of a charge, from a webhook or a
/// verification poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeNotice {
    pub reference: String,
    pub status: PaymentStatus,
    /// Charged amount in minor units, when the provider reports it.
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub gateway_id: Option<u64>,
}

impl Payment {
    pub fn generate_reference() -> String {
        format!("tp_{}", Uuid::new_v4().simple())
    }

    pub fn new(
        task_id: impl Into<String>,
        payer_id: impl Into<String>,
        payer_email: impl Into<String>,
        payee_id: impl Into<String>,
        currency: Currency,
        breakdown: FeeBreakdown,
    ) -> Self {
        let now = Utc::now();
        Self {
            reference: Self::generate_reference(),
            task_id: task_id.into(),
            payer_id: payer_id.into(),
            payer_email: payer_email.into(),
            payee_id: payee_id.into(),
            currency,
            breakdown,
            status: PaymentStatus::Pending,
            checkout_url: None,
            gateway_id: None,
            created_at: now,
            updated_at: now,
            settled_at: None,
        }
    }

    pub fn set_status(&mut self, status: PaymentStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        if status == PaymentStatus::Successful {
            self.settled_at = Some(now);
        }
    }
}
