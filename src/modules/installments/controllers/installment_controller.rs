use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::Result;
use crate::middleware::{ApiKeyAuth, AuthenticatedCustomer};
use crate::modules::installments::services::{InstallmentService, PreviewQuery};

/// Plans of an order (thank-you page, order view)
/// GET /orders/{order_id}/plans
pub async fn get_order_plans(
    service: web::Data<Arc<InstallmentService>>,
    path: web::Path<u64>,
    customer: AuthenticatedCustomer,
) -> Result<HttpResponse> {
    let plans = service.order_plans(path.into_inner(), customer.0).await?;
    Ok(HttpResponse::Ok().json(plans))
}

/// My-account dashboard
/// GET /customers/{customer_id}/installments
pub async fn get_customer_summary(
    service: web::Data<Arc<InstallmentService>>,
    path: web::Path<u64>,
    customer: AuthenticatedCustomer,
) -> Result<HttpResponse> {
    let summary = service
        .customer_summary(path.into_inner(), customer.0)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// GET /plans/{plan_id}
pub async fn get_plan(
    service: web::Data<Arc<InstallmentService>>,
    path: web::Path<String>,
    customer: AuthenticatedCustomer,
) -> Result<HttpResponse> {
    let details = service.plan_details(&path.into_inner(), customer.0).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// POST /installments/{id}/pay
pub async fn pay_now(
    service: web::Data<Arc<InstallmentService>>,
    path: web::Path<String>,
    customer: AuthenticatedCustomer,
) -> Result<HttpResponse> {
    let response = service.pay_now(&path.into_inner(), customer.0).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /products/installment-preview
pub async fn preview(
    service: web::Data<Arc<InstallmentService>>,
    query: web::Query<PreviewQuery>,
) -> Result<HttpResponse> {
    let preview = service.preview(&query)?;
    Ok(HttpResponse::Ok().json(preview))
}

/// POST /admin/plans/{plan_id}/cancel
pub async fn cancel_plan(
    service: web::Data<Arc<InstallmentService>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let details = service.cancel_plan(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Customer routes sit behind the host key; the preview is public
pub fn configure(cfg: &mut web::ServiceConfig, host_key_hash: Arc<str>) {
    cfg.service(
        web::resource("/orders/{order_id}/plans")
            .wrap(ApiKeyAuth::new(host_key_hash.clone()))
            .route(web::get().to(get_order_plans)),
    )
    .service(
        web::resource("/customers/{customer_id}/installments")
            .wrap(ApiKeyAuth::new(host_key_hash.clone()))
            .route(web::get().to(get_customer_summary)),
    )
    .service(
        web::resource("/plans/{plan_id}")
            .wrap(ApiKeyAuth::new(host_key_hash.clone()))
            .route(web::get().to(get_plan)),
    )
    .service(
        web::resource("/installments/{id}/pay")
            .wrap(ApiKeyAuth::new(host_key_hash))
            .route(web::post().to(pay_now)),
    )
    .route("/products/installment-preview", web::get().to(preview));
}

/// Routes mounted under the authenticated `/admin` scope
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.route("/plans/{plan_id}/cancel", web::post().to(cancel_plan));
}
