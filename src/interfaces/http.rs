//! Axum router for the marketplace backend and the provider's webhook.
//!
//! `build_router` is the single entry point; `main.rs` attaches tracing
//! middleware so tests can drive the bare router.

use crate::application::engine::{
    CheckoutOrder, SettlementEngine, SettlementOutcome, WebhookOutcome,
};
use crate::domain::fees::FeeBreakdown;
use crate::domain::ledger::LedgerEntry;
use crate::domain::payment::Payment;
use crate::domain::wallet::Wallet;
use crate::domain::withdrawal::Withdrawal;
use crate::error::PaymentError;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Header carrying the hex HMAC of the webhook body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

pub type SharedEngine = Arc<SettlementEngine>;

pub fn build_router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/quote", get(quote))
        .route("/checkout", post(checkout))
        .route("/payments/{reference}", get(get_payment))
        .route("/payments/{reference}/verify", post(verify_payment))
        .route("/webhooks/payments", post(webhook))
        .route("/wallets", get(list_wallets))
        .route("/wallets/{owner}", get(get_wallet))
        .route("/wallets/{owner}/freeze", post(freeze_wallet))
        .route("/wallets/{owner}/unfreeze", post(unfreeze_wallet))
        .route("/wallets/{owner}/ledger", get(get_ledger))
        .route("/wallets/{owner}/withdrawals", post(request_withdrawal))
        .route("/withdrawals/{reference}", get(get_withdrawal))
        .with_state(engine)
}

/// Maps domain errors onto HTTP status codes.
pub struct ApiError(PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            PaymentError::InvalidSignature => StatusCode::UNAUTHORIZED,
            PaymentError::ValidationError(_)
            | PaymentError::MalformedPayload(_)
            | PaymentError::CsvError(_) => StatusCode::BAD_REQUEST,
            PaymentError::UnknownReference(_) | PaymentError::WalletNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PaymentError::InvalidTransition { .. } => StatusCode::CONFLICT,
            PaymentError::AmountMismatch { .. }
            | PaymentError::InsufficientFunds(_)
            | PaymentError::WalletFrozen(_)
            | PaymentError::VerificationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::RateLimited { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::GatewayError { .. } | PaymentError::HttpError(_) => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::IoError(_)
            | PaymentError::ConfigError(_)
            | PaymentError::SerializationError(_)
            | PaymentError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct QuoteParams {
    amount: Decimal,
}

async fn quote(
    State(engine): State<SharedEngine>,
    Query(params): Query<QuoteParams>,
) -> ApiResult<Json<FeeBreakdown>> {
    Ok(Json(engine.quote(params.amount)?))
}

async fn checkout(
    State(engine): State<SharedEngine>,
    Json(order): Json<CheckoutOrder>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let payment = engine.initiate_checkout(order).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(engine): State<SharedEngine>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Payment>> {
    Ok(Json(engine.payment(&reference).await?))
}

async fn verify_payment(
    State(engine): State<SharedEngine>,
    Path(reference): Path<String>,
) -> ApiResult<Json<SettlementOutcome>> {
    Ok(Json(engine.verify_payment(&reference).await?))
}

async fn webhook(
    State(engine): State<SharedEngine>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookOutcome>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    Ok(Json(engine.handle_webhook(&body, signature).await?))
}

async fn get_wallet(
    State(engine): State<SharedEngine>,
    Path(owner): Path<String>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(engine.wallet(&owner).await?))
}

async fn list_wallets(State(engine): State<SharedEngine>) -> ApiResult<Json<Vec<Wallet>>> {
    Ok(Json(engine.wallets().await?))
}

async fn freeze_wallet(
    State(engine): State<SharedEngine>,
    Path(owner): Path<String>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(engine.set_wallet_frozen(&owner, true).await?))
}

async fn unfreeze_wallet(
    State(engine): State<SharedEngine>,
    Path(owner): Path<String>,
) -> ApiResult<Json<Wallet>> {
    Ok(Json(engine.set_wallet_frozen(&owner, false).await?))
}

async fn get_ledger(
    State(engine): State<SharedEngine>,
    Path(owner): Path<String>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    Ok(Json(engine.ledger(&owner).await?))
}

#[derive(Deserialize)]
struct WithdrawalRequest {
    amount: Decimal,
}

async fn request_withdrawal(
    State(engine): State<SharedEngine>,
    Path(owner): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> ApiResult<(StatusCode, Json<Withdrawal>)> {
    let withdrawal = engine.request_withdrawal(&owner, request.amount).await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

async fn get_withdrawal(
    State(engine): State<SharedEngine>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Withdrawal>> {
    Ok(Json(engine.withdrawal(&reference).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (PaymentError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (
                PaymentError::UnknownReference("tp_x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PaymentError::RateLimited { retry_after: None },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PaymentError::InsufficientFunds("t1".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PaymentError::InvalidTransition {
                    reference: "tp_x".into(),
                    from: "successful".into(),
                    to: "failed".into(),
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }
}
