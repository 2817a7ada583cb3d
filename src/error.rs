use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Rate limited by payment gateway")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Payment gateway error (status {status}): {message}")]
    GatewayError { status: u16, message: String },
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
    #[error("Unknown reference: {0}")]
    UnknownReference(String),
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),
    #[error("Insufficient funds in wallet {0}")]
    InsufficientFunds(String),
    #[error("Wallet {0} is frozen")]
    WalletFrozen(String),
    #[error("Invalid status transition for {reference}: {from} -> {to}")]
    InvalidTransition {
        reference: String,
        from: String,
        to: String,
    },
    #[error("Amount mismatch for {reference}: expected {expected}, got {actual}")]
    AmountMismatch {
        reference: String,
        expected: String,
        actual: String,
    },
    #[error("Could not verify payment {reference}: {reason}")]
    VerificationFailed { reference: String, reason: String },
    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
