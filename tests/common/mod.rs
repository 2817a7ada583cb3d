#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use taskpay::application::engine::{CheckoutOrder, EngineConfig, SettlementEngine, Stores};
use taskpay::application::retry::RetryPolicy;
use taskpay::domain::money::Currency;
use taskpay::domain::payment::{Payment, PaymentStatus};
use taskpay::domain::ports::{CheckoutRequest, CheckoutSession, GatewayVerification, PaymentGateway};
use taskpay::domain::webhook::WebhookVerifier;
use taskpay::error::{PaymentError, Result};
use taskpay::infrastructure::in_memory::in_memory_stores;

pub const WEBHOOK_SECRET: &str = "sk_test_webhook";

/// A provider double: checkouts always open, verification answers with
/// whatever the test scripted.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    pub checkouts: Arc<AtomicU32>,
    pub verifications: Arc<AtomicU32>,
    pub verify_result: Arc<Mutex<Option<GatewayVerification>>>,
}

impl ScriptedGateway {
    pub fn answer_verify(&self, verification: GatewayVerification) {
        *self.verify_result.lock().unwrap() = Some(verification);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            reference: request.reference.clone(),
            checkout_url: format!("https://checkout.test/{}", request.reference),
            access_code: Some("acc_test".to_string()),
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        self.verify_result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

pub fn engine_with(gateway: ScriptedGateway, stores: Stores, verify: bool) -> SettlementEngine {
    let config = EngineConfig {
        retry: fast_retry(),
        verify_with_gateway: verify,
        ..EngineConfig::default()
    };
    SettlementEngine::new(
        stores,
        Box::new(gateway),
        WebhookVerifier::new(WEBHOOK_SECRET),
        config,
    )
}

pub fn engine(gateway: ScriptedGateway) -> SettlementEngine {
    engine_with(gateway, in_memory_stores(), false)
}

pub fn order(payee: &str, amount: Decimal) -> CheckoutOrder {
    CheckoutOrder {
        task_id: "task-42".to_string(),
        payer_id: "client-1".to_string(),
        payer_email: "client@example.com".to_string(),
        payee_id: payee.to_string(),
        amount,
        callback_url: None,
    }
}

pub fn sign(body: &str) -> String {
    WebhookVerifier::new(WEBHOOK_SECRET)
        .sign(body.as_bytes())
        .unwrap()
}

/// The total the provider would report for `payment`, in kobo.
pub fn charged_minor(payment: &Payment) -> i64 {
    taskpay::domain::money::to_minor_units(payment.breakdown.total).unwrap()
}

pub fn charge_event(event: &str, payment: &Payment, status: &str) -> String {
    serde_json::json!({
        "event": event,
        "data": {
            "id": 9001,
            "reference": payment.reference,
            "status": status,
            "amount": charged_minor(payment),
            "currency": payment.currency.as_str(),
        }
    })
    .to_string()
}

pub fn verification(payment: &Payment, status: PaymentStatus) -> GatewayVerification {
    GatewayVerification {
        reference: payment.reference.clone(),
        status,
        amount_minor: charged_minor(payment),
        currency: Currency::default(),
        gateway_id: Some(9001),
    }
}
