use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::Result;
use crate::middleware::ApiKeyAuth;
use crate::modules::payments::services::PaymentOrchestrator;

/// Charge an order at checkout
/// POST /orders/{order_id}/checkout
pub async fn checkout(
    orchestrator: web::Data<Arc<PaymentOrchestrator>>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let outcome = orchestrator.on_order_submit(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Order completed in the host platform
/// POST /orders/{order_id}/completed
pub async fn order_completed(
    orchestrator: web::Data<Arc<PaymentOrchestrator>>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let order_id = path.into_inner();
    let plans = orchestrator.on_order_completed(order_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "order_id": order_id,
        "plans": plans,
    })))
}

/// Called by the host store, authenticated with its key
pub fn configure(cfg: &mut web::ServiceConfig, host_key_hash: Arc<str>) {
    cfg.service(
        web::resource("/orders/{order_id}/checkout")
            .wrap(ApiKeyAuth::new(host_key_hash.clone()))
            .route(web::post().to(checkout)),
    )
    .service(
        web::resource("/orders/{order_id}/completed")
            .wrap(ApiKeyAuth::new(host_key_hash))
            .route(web::post().to(order_completed)),
    );
}
