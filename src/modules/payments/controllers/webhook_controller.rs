use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{error, warn};

use crate::core::{AppError, Result};
use crate::middleware::rate_limit::{client_ip, RateLimit, RateLimiter};
use crate::modules::gateways::services::signature::SIGNATURE_HEADER;
use crate::modules::payments::services::WebhookHandler;

fn text(status: actix_web::http::StatusCode, body: &'static str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(body)
}

/// Map a processing result to the bare status the payment API expects
pub fn webhook_response(result: &Result<()>) -> HttpResponse {
    use actix_web::http::StatusCode;

    match result {
        Ok(()) => text(StatusCode::OK, "OK"),
        Err(AppError::WebhookIntegrity(_)) => text(StatusCode::UNAUTHORIZED, "Unauthorized"),
        Err(AppError::Validation(_)) | Err(AppError::Json(_)) => {
            text(StatusCode::BAD_REQUEST, "Bad Request")
        }
        Err(_) => text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    }
}

/// POST /webhooks/tap
pub async fn receive_webhook(
    handler: web::Data<Arc<WebhookHandler>>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    let result = handler
        .on_webhook_received(&body, signature)
        .await
        .map(|_| ());

    match &result {
        Err(AppError::WebhookIntegrity(reason)) => {
            warn!(client_ip = %client_ip(&req), reason = %reason, "Webhook rejected");
        }
        Err(e @ (AppError::Validation(_) | AppError::Json(_))) => {
            warn!(client_ip = %client_ip(&req), error = %e, "Malformed webhook payload");
        }
        Err(e) => error!(error = %e, "Webhook processing failed"),
        Ok(()) => {}
    }

    webhook_response(&result)
}

async fn method_not_allowed() -> HttpResponse {
    text(
        actix_web::http::StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
    )
}

/// Reconcile a charge against the payment API
/// POST /admin/charges/{charge_id}/reconcile
pub async fn reconcile_charge(
    handler: web::Data<Arc<WebhookHandler>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = handler.reconcile_charge(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "outcome": outcome })))
}

/// Reconcile an installment invoice against the payment API
/// POST /admin/invoices/{invoice_id}/reconcile
pub async fn reconcile_invoice(
    handler: web::Data<Arc<WebhookHandler>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = handler.reconcile_invoice(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "outcome": outcome })))
}

/// Public webhook endpoint, rate limited per client IP
pub fn configure(cfg: &mut web::ServiceConfig, limiter: Arc<dyn RateLimiter>) {
    cfg.service(
        web::resource("/webhooks/tap")
            .wrap(RateLimit::new(limiter))
            .route(web::post().to(receive_webhook))
            .default_service(web::to(method_not_allowed)),
    );
}

/// Routes mounted under the authenticated `/admin` scope
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/charges/{charge_id}/reconcile",
        web::post().to(reconcile_charge),
    )
    .route(
        "/invoices/{invoice_id}/reconcile",
        web::post().to(reconcile_invoice),
    );
}
