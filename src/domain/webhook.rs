use super::money::Currency;
use super::payment::{ChargeNotice, PaymentStatus};
use crate::error::{PaymentError, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Checks that a webhook body was signed by the payment provider.
///
/// The provider signs the raw request body with HMAC-SHA512 keyed by the
/// shared webhook secret and sends the lower-case hex digest in a header.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Returns `Ok(false)` for any signature that does not match, including
    /// empty or non-hex input.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return Ok(false);
        };
        if expected.is_empty() {
            return Ok(false);
        }
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(mac.verify_slice(&expected).is_ok())
    }

    fn mac(&self) -> Result<HmacSha512> {
        HmacSha512::new_from_slice(&self.secret).map_err(|e| {
            PaymentError::InternalError(Box::new(std::io::Error::other(e.to_string())))
        })
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ChargeSucceeded,
    ChargeFailed,
    TransferSucceeded,
    TransferFailed,
    Other(String),
}

/// The fields settlement reads from charge and transfer events.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EventData {
    pub reference: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
}

/// A provider callback body.
///
/// `data` stays untyped until the event is known to be one we settle, so
/// events of other shapes can still be acknowledged.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| PaymentError::MalformedPayload(e.to_string()))
    }

    /// Typed view of `data`; a missing reference is malformed.
    pub fn data(&self) -> Result<EventData> {
        EventData::deserialize(&self.data).map_err(|e| {
            PaymentError::MalformedPayload(format!("{}: {e}", self.event))
        })
    }

    pub fn kind(&self) -> EventKind {
        match self.event.as_str() {
            "charge.success" => EventKind::ChargeSucceeded,
            "charge.failed" => EventKind::ChargeFailed,
            "transfer.success" => EventKind::TransferSucceeded,
            "transfer.failed" | "transfer.reversed" => EventKind::TransferFailed,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Converts a charge event into a notice the settlement engine can apply.
    ///
    /// The event name decides success or failure; `data.status` is only
    /// consulted to distinguish abandoned checkouts among failures.
    pub fn charge_notice(&self) -> Result<Option<ChargeNotice>> {
        let succeeded = match self.kind() {
            EventKind::ChargeSucceeded => true,
            EventKind::ChargeFailed => false,
            _ => return Ok(None),
        };
        let data = self.data()?;
        let status = if succeeded {
            PaymentStatus::Successful
        } else {
            match data.status.as_deref().and_then(PaymentStatus::from_gateway) {
                Some(PaymentStatus::Abandoned) => PaymentStatus::Abandoned,
                _ => PaymentStatus::Failed,
            }
        };
        let currency = data
            .currency
            .as_deref()
            .map(str::parse::<Currency>)
            .transpose()
            .map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;
        Ok(Some(ChargeNotice {
            reference: data.reference,
            status,
            amount_minor: data.amount,
            currency,
            gateway_id: data.id,
        }))
    }
}
