use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::InstallmentSettings;
use crate::core::dates::monthly_due_dates;
use crate::core::{AppError, Result};
use crate::modules::gateways::services::PaymentGateway;
use crate::modules::installments::models::{
    CustomerSummary, InstallmentPlan, InstallmentStatus, PlanDetails, PlanStatus,
};
use crate::modules::installments::repositories::{InstallmentRepository, PlanRepository};
use crate::modules::installments::services::installment_calculator::{
    InstallmentBreakdown, InstallmentCalculator,
};
use crate::modules::installments::services::invoice_issuer::InvoiceIssuer;
use crate::modules::orders::services::OrderStore;

/// Raw product-page / checkout values; coerced like host meta fields
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewQuery {
    pub current_price: String,
    pub full_amount: String,
    pub installment_count: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallmentPreview {
    #[serde(flatten)]
    pub breakdown: InstallmentBreakdown,
    /// Due dates if the order were placed today
    pub due_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayNowResponse {
    pub installment_id: String,
    pub invoice_id: String,
    pub invoice_url: Option<String>,
}

/// Read side of plans plus the customer and admin actions on them
pub struct InstallmentService {
    plans: Arc<dyn PlanRepository>,
    installments: Arc<dyn InstallmentRepository>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    issuer: Arc<InvoiceIssuer>,
    settings: InstallmentSettings,
}

impl InstallmentService {
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        installments: Arc<dyn InstallmentRepository>,
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        issuer: Arc<InvoiceIssuer>,
        settings: InstallmentSettings,
    ) -> Self {
        Self {
            plans,
            installments,
            orders,
            gateway,
            issuer,
            settings,
        }
    }

    async fn find_plan(&self, plan_id: &str) -> Result<InstallmentPlan> {
        self.plans
            .find_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Installment plan {} not found", plan_id)))
    }

    async fn details(&self, plan: InstallmentPlan, today: NaiveDate) -> Result<PlanDetails> {
        let installments = self.installments.find_by_plan(&plan.id).await?;
        Ok(PlanDetails::build(plan, installments, today))
    }

    /// One plan, for its owner
    pub async fn plan_details(&self, plan_id: &str, customer_id: u64) -> Result<PlanDetails> {
        let plan = self.find_plan(plan_id).await?;
        ensure_owner(&plan, customer_id)?;
        self.details(plan, today()).await
    }

    /// Plans of one order, for the thank-you and order pages
    pub async fn order_plans(&self, order_id: u64, customer_id: u64) -> Result<Vec<PlanDetails>> {
        let today = today();
        let mut details = Vec::new();
        for plan in self.plans.find_by_order(order_id).await? {
            ensure_owner(&plan, customer_id)?;
            details.push(self.details(plan, today).await?);
        }
        Ok(details)
    }

    /// Dashboard of `customer_id`, visible to that customer only
    pub async fn customer_summary(
        &self,
        customer_id: u64,
        requested_by: u64,
    ) -> Result<CustomerSummary> {
        if customer_id != requested_by {
            warn!(customer_id, requested_by, "Summary requested for another customer");
            return Err(AppError::unauthorized("Customer mismatch"));
        }
        let today = today();
        let mut details = Vec::new();
        for plan in self.plans.find_by_customer(customer_id).await? {
            details.push(self.details(plan, today).await?);
        }
        Ok(CustomerSummary::build(customer_id, details))
    }

    /// Invoice a pending installment on the customer's request.
    ///
    /// An installment that already has an invoice returns it instead of
    /// issuing a second one.
    pub async fn pay_now(&self, installment_id: &str, customer_id: u64) -> Result<PayNowResponse> {
        let installment = self
            .installments
            .find_by_id(installment_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Installment {} not found", installment_id)))?;
        let plan = self.find_plan(&installment.plan_id).await?;

        ensure_owner(&plan, customer_id)?;

        if installment.status == InstallmentStatus::Invoiced {
            if let Some(invoice_id) = installment.tap_invoice_id.clone() {
                return Ok(PayNowResponse {
                    installment_id: installment.id,
                    invoice_id,
                    invoice_url: installment.invoice_url,
                });
            }
        }

        if installment.status != InstallmentStatus::Pending {
            return Err(AppError::validation(format!(
                "Installment is {} and cannot be paid",
                installment.status
            )));
        }
        if plan.status != PlanStatus::Active {
            return Err(AppError::validation(format!(
                "Installment plan is {}",
                plan.status
            )));
        }

        let order = self.orders.get_order(plan.order_id).await?;
        let invoice = self.issuer.issue(&order, &plan, &installment).await?;

        Ok(PayNowResponse {
            installment_id: installment.id,
            invoice_id: invoice.id,
            invoice_url: invoice.url,
        })
    }

    /// Administrative cancellation. Open installments are cancelled with the
    /// plan; their invoices are cancelled at the API where possible.
    pub async fn cancel_plan(&self, plan_id: &str) -> Result<PlanDetails> {
        let plan = self.find_plan(plan_id).await?;

        let cancelled = self
            .plans
            .transition_status(
                &plan.id,
                &[PlanStatus::Pending, PlanStatus::Active],
                PlanStatus::Cancelled,
            )
            .await?;
        if !cancelled {
            return Err(AppError::validation(format!(
                "Installment plan is {} and cannot be cancelled",
                plan.status
            )));
        }

        let now = Utc::now();
        for installment in self.installments.find_by_plan(&plan.id).await? {
            let moved = self
                .installments
                .transition_status(
                    &installment.id,
                    &InstallmentStatus::OPEN,
                    InstallmentStatus::Cancelled,
                    now,
                )
                .await?;

            if let (true, Some(invoice_id)) = (moved, installment.tap_invoice_id.as_deref()) {
                if let Err(e) = self.gateway.cancel_invoice(invoice_id).await {
                    warn!(invoice_id, error = %e, "Failed to cancel installment invoice");
                }
            }
        }

        info!(order_id = plan.order_id, plan_id = %plan.id, "Installment plan cancelled");
        if let Err(e) = self
            .orders
            .add_note(plan.order_id, "Installment plan cancelled by administrator.")
            .await
        {
            warn!(order_id = plan.order_id, error = %e, "Failed to add order note");
        }

        let cancelled = self.find_plan(&plan.id).await?;
        self.details(cancelled, today()).await
    }

    /// Breakdown shown on the product page and checkout summary
    pub fn preview(&self, query: &PreviewQuery) -> Result<InstallmentPreview> {
        let default_count = self.settings.default_count.to_string();
        let count = query
            .installment_count
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&default_count);
        let quantity = query.quantity.as_deref().unwrap_or("1");

        let breakdown = InstallmentCalculator::calculate_raw(
            &query.current_price,
            &query.full_amount,
            count,
            quantity,
        )?;
        InstallmentCalculator::check_limits(&breakdown, &self.settings)?;

        Ok(InstallmentPreview {
            due_dates: monthly_due_dates(today(), breakdown.installment_count)?,
            breakdown,
        })
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn ensure_owner(plan: &InstallmentPlan, customer_id: u64) -> Result<()> {
    if plan.customer_id != customer_id {
        warn!(plan_id = %plan.id, customer_id, "Plan requested by another customer");
        return Err(AppError::unauthorized("Installment plan does not belong to this customer"));
    }
    Ok(())
}
