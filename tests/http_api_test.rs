mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ScriptedGateway, charge_event, engine, order, sign};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use taskpay::domain::payment::Payment;
use taskpay::interfaces::http::{SIGNATURE_HEADER, build_router};
use tower::ServiceExt;

fn app() -> Router {
    build_router(Arc::new(engine(ScriptedGateway::default())))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "taskpay");
}

#[tokio::test]
async fn test_quote() {
    let app = app();
    let (status, body) = send(&app, get("/quote?amount=5000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["vat"]), dec!(37.5));
    assert_eq!(decimal(&body["total"]), dec!(5720.56));

    let (status, body) = send(&app, get("/quote?amount=-3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("positive"));

    let (status, body) = send(&app, get("/quote?amount=79228162514264337593543950335")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceed"));
}

#[tokio::test]
async fn test_oversized_checkout_is_rejected() {
    let app = app();
    let (status, _) = send(
        &app,
        post_json(
            "/checkout",
            serde_json::json!({
                "task_id": "task-1",
                "payer_id": "client-1",
                "payer_email": "client@example.com",
                "payee_id": "tasker-1",
                "amount": "1000000000000000000000000000",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_unknown_reference_never_reaches_provider() {
    let gateway = ScriptedGateway::default();
    let app = build_router(Arc::new(engine(gateway.clone())));

    for uri in [
        "/payments/tp_missing/verify",
        "/payments/..%2F..%2Fbalance/verify",
    ] {
        let request = Request::post(uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    assert_eq!(gateway.verifications.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_checkout_webhook_and_withdrawal() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json(
            "/checkout",
            serde_json::to_value(order("tasker-7", dec!(5000))).unwrap(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let payment: Payment = serde_json::from_value(body).unwrap();
    assert!(payment.checkout_url.is_some());

    let event = charge_event("charge.success", &payment, "success");
    let request = Request::post("/webhooks/payments")
        .header(SIGNATURE_HEADER, sign(&event))
        .body(Body::from(event.clone()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "charge");
    assert_eq!(body["result"]["outcome"], "credited");

    let (status, body) = send(&app, get(&format!("/payments/{}", payment.reference))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "successful");

    let (status, body) = send(&app, get("/wallets/tasker-7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["available"]), dec!(5000));

    let (status, _) = send(
        &app,
        post_json(
            "/wallets/tasker-7/withdrawals",
            serde_json::json!({ "amount": "6000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        post_json(
            "/wallets/tasker-7/withdrawals",
            serde_json::json!({ "amount": "1200" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let withdrawal = body["reference"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get(&format!("/withdrawals/{withdrawal}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["amount"]), dec!(1200));

    let (status, body) = send(&app, get("/wallets/tasker-7/ledger")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, get("/wallets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["owner"], "tasker-7");
    assert_eq!(decimal(&body[0]["held"]), dec!(1200));
}

#[tokio::test]
async fn test_frozen_wallet_rejects_withdrawals() {
    let app = app();
    let (_, body) = send(
        &app,
        post_json(
            "/checkout",
            serde_json::to_value(order("tasker-9", dec!(1000))).unwrap(),
        ),
    )
    .await;
    let payment: Payment = serde_json::from_value(body).unwrap();
    let event = charge_event("charge.success", &payment, "success");
    let request = Request::post("/webhooks/payments")
        .header(SIGNATURE_HEADER, sign(&event))
        .body(Body::from(event))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let freeze = Request::post("/wallets/tasker-9/freeze")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, freeze).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "frozen");

    let (status, _) = send(
        &app,
        post_json(
            "/wallets/tasker-9/withdrawals",
            serde_json::json!({ "amount": "10" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let unfreeze = Request::post("/wallets/tasker-9/unfreeze")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, unfreeze).await;
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let app = app();
    let body = r#"{"event":"charge.success","data":{"reference":"tp_1"}}"#;

    let request = Request::post("/webhooks/payments")
        .header(SIGNATURE_HEADER, "00ff")
        .body(Body::from(body))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid webhook signature");

    let request = Request::post("/webhooks/payments")
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_resources() {
    let app = app();
    let (status, _) = send(&app, get("/payments/tp_missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/wallets/nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
