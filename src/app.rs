use std::sync::Arc;

use actix_web::web;
use sqlx::MySqlPool;

use crate::config::Config;
use crate::middleware::error_handler::{json_config, path_config, query_config};
use crate::middleware::{ApiKeyAuth, InMemoryRateLimiter, RateLimiter};
use crate::modules::gateways::services::PaymentGateway;
use crate::modules::health;
use crate::modules::installments::controllers as installment_controllers;
use crate::modules::installments::repositories::{
    InstallmentRepository, MySqlInstallmentRepository, MySqlPlanRepository, PlanRepository,
};
use crate::modules::installments::services::{InstallmentService, InvoiceIssuer, PlanBuilder};
use crate::modules::notifications::services::Notifier;
use crate::modules::orders::services::OrderStore;
use crate::modules::payments::controllers::{checkout_controller, webhook_controller};
use crate::modules::payments::repositories::{MySqlPaymentRepository, PaymentRepository};
use crate::modules::payments::services::{PaymentOrchestrator, WebhookHandler};
use crate::modules::reports::controllers as report_controllers;
use crate::modules::reports::repositories::{MySqlReportRepository, ReportRepository};
use crate::modules::reports::services::ReportService;
use crate::modules::scheduler::controllers as scheduler_controllers;
use crate::modules::scheduler::services::SchedulerService;

/// Storage seams
#[derive(Clone)]
pub struct Repositories {
    pub plans: Arc<dyn PlanRepository>,
    pub installments: Arc<dyn InstallmentRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

impl Repositories {
    pub fn mysql(pool: MySqlPool) -> Self {
        Self {
            plans: Arc::new(MySqlPlanRepository::new(pool.clone())),
            installments: Arc::new(MySqlInstallmentRepository::new(pool.clone())),
            payments: Arc::new(MySqlPaymentRepository::new(pool.clone())),
            reports: Arc::new(MySqlReportRepository::new(pool)),
        }
    }
}

/// External collaborators: payment API, host store, mail transport
#[derive(Clone)]
pub struct Collaborators {
    pub gateway: Arc<dyn PaymentGateway>,
    pub orders: Arc<dyn OrderStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Every service, constructed once and shared by all workers
#[derive(Clone)]
pub struct AppServices {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub webhooks: Arc<WebhookHandler>,
    pub installments: Arc<InstallmentService>,
    pub scheduler: Arc<SchedulerService>,
    pub reports: Arc<ReportService>,
    pub limiter: Arc<dyn RateLimiter>,
    pub admin_key_hash: Arc<str>,
    pub host_key_hash: Arc<str>,
}

impl AppServices {
    pub fn new(config: &Config, repos: Repositories, collaborators: Collaborators) -> Self {
        let Collaborators {
            gateway,
            orders,
            notifier,
        } = collaborators;

        let webhook_url = format!("{}/webhooks/tap", config.app.site_url.trim_end_matches('/'));
        let success_url = Some(config.redirects.success_url.clone()).filter(|u| !u.is_empty());

        let issuer = Arc::new(InvoiceIssuer::new(
            gateway.clone(),
            repos.installments.clone(),
            config.scheduler.invoice_expiry_days,
            success_url,
            webhook_url.clone(),
        ));

        let orchestrator = Arc::new(PaymentOrchestrator::new(
            repos.plans.clone(),
            repos.installments.clone(),
            repos.payments.clone(),
            gateway.clone(),
            orders.clone(),
            PlanBuilder::new(orders.clone(), config.installments.clone()),
            config.redirects.clone(),
            webhook_url,
        ));

        let webhooks = Arc::new(WebhookHandler::new(
            repos.payments.clone(),
            repos.plans.clone(),
            repos.installments.clone(),
            orders.clone(),
            notifier.clone(),
            gateway.clone(),
            config.tap.webhook_secret.clone(),
        ));

        let installments = Arc::new(InstallmentService::new(
            repos.plans.clone(),
            repos.installments.clone(),
            orders.clone(),
            gateway,
            issuer.clone(),
            config.installments.clone(),
        ));

        let reports = Arc::new(ReportService::new(repos.reports.clone()));

        let scheduler = Arc::new(SchedulerService::new(
            repos.plans,
            repos.installments,
            orders,
            notifier,
            issuer,
            reports.clone(),
            config.scheduler.clone(),
            config.app.admin_email.clone(),
        ));

        Self {
            orchestrator,
            webhooks,
            installments,
            scheduler,
            reports,
            limiter: Arc::new(InMemoryRateLimiter::per_hour(
                config.webhook.rate_limit_per_hour,
            )),
            admin_key_hash: config.security.admin_api_key_hash.as_str().into(),
            host_key_hash: config.security.host_api_key_hash.as_str().into(),
        }
    }

    /// Register shared state and every route
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .app_data(web::Data::new(self.orchestrator.clone()))
            .app_data(web::Data::new(self.webhooks.clone()))
            .app_data(web::Data::new(self.installments.clone()))
            .app_data(web::Data::new(self.scheduler.clone()))
            .app_data(web::Data::new(self.reports.clone()));

        health::controllers::configure(cfg);
        webhook_controller::configure(cfg, self.limiter.clone());
        checkout_controller::configure(cfg, self.host_key_hash.clone());
        installment_controllers::configure(cfg, self.host_key_hash.clone());

        cfg.service(
            web::scope("/admin")
                .wrap(ApiKeyAuth::new(self.admin_key_hash.clone()))
                .configure(scheduler_controllers::configure_admin)
                .configure(webhook_controller::configure_admin)
                .configure(report_controllers::configure_admin)
                .configure(installment_controllers::configure_admin),
        );
    }
}
