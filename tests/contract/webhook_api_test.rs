// Contract tests for POST /webhooks/tap
//
// The endpoint answers the payment API with bare statuses: 200 once the event
// is accepted (including unknown objects), 401 for signature failures, 400 for
// malformed payloads and 405 for any other method.

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::{test, App};
use serde_json::json;

use helpers::*;
use splitpay::modules::installments::models::{InstallmentStatus, PlanStatus};

/// Checkout order 1001 and give its first installment an open invoice
async fn app_with_open_invoice(invoice_id: &str) -> TestApp {
    let app = TestApp::new().with_installment_order();
    app.services
        .orchestrator
        .on_order_submit(1001)
        .await
        .expect("checkout");

    let mut first = app.store.installments()[0].clone();
    first.status = InstallmentStatus::Invoiced;
    first.tap_invoice_id = Some(invoice_id.to_string());
    app.store.put_installment(first);
    app
}

fn paid_invoice(invoice_id: &str) -> String {
    json!({
        "id": invoice_id,
        "object": "invoice",
        "status": "PAID",
        "charge": {"id": "chg_inst_1"}
    })
    .to_string()
}

#[actix_web::test]
async fn test_signed_webhook_returns_ok() {
    let app = app_with_open_invoice("inv_100").await;
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let body = paid_invoice("inv_100");
    let req = test::TestRequest::post()
        .uri("/webhooks/tap")
        .insert_header(("content-type", "application/json"))
        .insert_header(("X-Tap-Signature", sign(&body)))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(test::read_body(resp).await, "OK");

    let paid = app
        .store
        .installments()
        .into_iter()
        .filter(|i| i.status == InstallmentStatus::Paid)
        .count();
    assert_eq!(paid, 1);
}

#[actix_web::test]
async fn test_altered_byte_returns_unauthorized_without_mutation() {
    let app = app_with_open_invoice("inv_100").await;
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let body = paid_invoice("inv_100");
    let signature = sign(&body);
    let tampered = body.replace("PAID", "PAIT");

    let req = test::TestRequest::post()
        .uri("/webhooks/tap")
        .insert_header(("content-type", "application/json"))
        .insert_header(("X-Tap-Signature", signature))
        .set_payload(tampered)
        .to_request();

    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(test::read_body(resp).await, "Unauthorized");

    assert!(app
        .store
        .installments()
        .iter()
        .all(|i| i.status != InstallmentStatus::Paid));
    assert_eq!(app.store.payments().len(), 1, "only the checkout payment");
}

#[actix_web::test]
async fn test_missing_signature_returns_unauthorized() {
    let app = TestApp::new();
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/webhooks/tap")
        .insert_header(("content-type", "application/json"))
        .set_payload(paid_invoice("inv_100"))
        .to_request();

    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_invalid_json_returns_bad_request() {
    let app = TestApp::new();
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let body = "{not json";
    let req = test::TestRequest::post()
        .uri("/webhooks/tap")
        .insert_header(("content-type", "application/json"))
        .insert_header(("X-Tap-Signature", sign(body)))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(test::read_body(resp).await, "Bad Request");
}

#[actix_web::test]
async fn test_missing_fields_return_bad_request() {
    let app = TestApp::new();
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    for body in [
        json!({"object": "charge", "status": "CAPTURED"}).to_string(),
        json!({"id": "chg_1", "status": "CAPTURED"}).to_string(),
        json!({"id": "ref_1", "object": "refund", "status": "REFUNDED"}).to_string(),
        String::new(),
    ] {
        let req = test::TestRequest::post()
            .uri("/webhooks/tap")
            .insert_header(("content-type", "application/json"))
            .insert_header(("X-Tap-Signature", sign(&body)))
            .set_payload(body.clone())
            .to_request();

        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), 400, "payload {:?}", body);
    }
}

#[actix_web::test]
async fn test_get_returns_method_not_allowed() {
    let app = TestApp::new();
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/webhooks/tap").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 405);
}

#[actix_web::test]
async fn test_unknown_objects_are_acknowledged_without_mutation() {
    let app = app_with_open_invoice("inv_100").await;
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let before = app.store.installments();

    for body in [
        paid_invoice("inv_unknown"),
        json!({"id": "chg_unknown", "object": "charge", "status": "CAPTURED"}).to_string(),
    ] {
        let req = test::TestRequest::post()
            .uri("/webhooks/tap")
            .insert_header(("content-type", "application/json"))
            .insert_header(("X-Tap-Signature", sign(&body)))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), 200);
    }

    let after = app.store.installments();
    assert_eq!(
        before.iter().map(|i| i.status).collect::<Vec<_>>(),
        after.iter().map(|i| i.status).collect::<Vec<_>>()
    );
    assert!(app.orders.completed_payments.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn test_invoice_reconcile_uses_live_status() {
    let app = app_with_open_invoice("inv_100").await;
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;
    app.gateway.set_live_invoice(
        "inv_100",
        json!({"id": "inv_100", "status": "PAID", "charge": {"id": "chg_inst_1"}}),
    );

    let req = test::TestRequest::post()
        .uri("/admin/invoices/inv_100/reconcile")
        .to_request();
    let err = test::try_call_service(&service, req)
        .await
        .expect_err("admin routes reject requests without a key");
    assert_eq!(err.as_response_error().status_code(), 401);

    let req = test::TestRequest::post()
        .uri("/admin/invoices/inv_100/reconcile")
        .insert_header(("X-API-Key", ADMIN_API_KEY))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["outcome"], "processed");
    assert_eq!(app.store.installments()[0].status, InstallmentStatus::Paid);
}

#[actix_web::test]
async fn test_charge_reconcile_activates_plan() {
    let app = TestApp::new().with_installment_order();
    let outcome = app
        .services
        .orchestrator
        .on_order_submit(1001)
        .await
        .expect("checkout");
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    // Still in progress at the API: recorded, nothing activated
    app.gateway.set_live_charge(&outcome.charge_id, "IN_PROGRESS");
    let req = test::TestRequest::post()
        .uri(&format!("/admin/charges/{}/reconcile", outcome.charge_id))
        .insert_header(("X-API-Key", ADMIN_API_KEY))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(app.store.plans()[0].status, PlanStatus::Pending);

    app.gateway.set_live_charge(&outcome.charge_id, "CAPTURED");
    let req = test::TestRequest::post()
        .uri(&format!("/admin/charges/{}/reconcile", outcome.charge_id))
        .insert_header(("X-API-Key", ADMIN_API_KEY))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(app.store.plans()[0].status, PlanStatus::Active);
    assert_eq!(app.store.payments()[0].status, "CAPTURED");
}

#[actix_web::test]
async fn test_reconcile_unknown_charge_is_bad_gateway() {
    let app = TestApp::new();
    let service =
        test::init_service(App::new().configure(|cfg| app.services.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/admin/charges/chg_missing/reconcile")
        .insert_header(("X-API-Key", ADMIN_API_KEY))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 502);
}
