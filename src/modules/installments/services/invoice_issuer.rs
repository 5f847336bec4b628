use std::sync::Arc;

use chrono::Days;
use serde_json::{json, Map};
use tracing::{info, warn};

use crate::core::{AppError, Result};
use crate::modules::gateways::services::{Invoice, InvoiceRequest, PaymentGateway};
use crate::modules::installments::models::{Installment, InstallmentPlan};
use crate::modules::installments::repositories::InstallmentRepository;
use crate::modules::notifications::models::InstallmentContext;
use crate::modules::orders::models::Order;

/// Issues the payment API invoice for one installment and records it
pub struct InvoiceIssuer {
    gateway: Arc<dyn PaymentGateway>,
    installments: Arc<dyn InstallmentRepository>,
    expiry_days: u32,
    redirect_url: Option<String>,
    webhook_url: String,
}

impl InvoiceIssuer {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        installments: Arc<dyn InstallmentRepository>,
        expiry_days: u32,
        redirect_url: Option<String>,
        webhook_url: String,
    ) -> Self {
        Self {
            gateway,
            installments,
            expiry_days,
            redirect_url,
            webhook_url,
        }
    }

    pub fn request(&self, ctx: &InstallmentContext<'_>) -> Result<InvoiceRequest> {
        let installment = ctx.installment;
        let plan = ctx.plan;
        let product = ctx.product_name();

        let expiry = installment
            .due_date
            .checked_add_days(Days::new(u64::from(self.expiry_days)))
            .ok_or_else(|| AppError::validation("Invoice expiry out of range"))?;

        let mut metadata = Map::new();
        metadata.insert("order_id".into(), json!(plan.order_id));
        metadata.insert("plan_id".into(), json!(plan.id));
        metadata.insert("installment_id".into(), json!(installment.id));
        metadata.insert("installment_number".into(), json!(installment.installment_number));
        metadata.insert("automated".into(), json!(true));

        Ok(InvoiceRequest {
            amount: installment.amount,
            currency: plan.currency,
            due: installment.due_date,
            expiry,
            description: format!(
                "Installment {} of {} for {}",
                installment.installment_number, plan.installment_count, product
            ),
            note: format!("Automated installment payment for Order #{}", plan.order_id),
            item_description: format!(
                "Installment {} of {} - {}",
                installment.installment_number, plan.installment_count, product
            ),
            customer: ctx.order.billing.to_gateway_customer(),
            metadata,
            redirect_url: self.redirect_url.clone(),
            post_url: Some(self.webhook_url.clone()).filter(|u| !u.is_empty()),
        })
    }

    /// Create the invoice and move the installment `pending` → `invoiced`.
    ///
    /// When the installment left `pending` while the call was in flight the
    /// fresh invoice is cancelled and a validation error returned.
    pub async fn issue(
        &self,
        order: &Order,
        plan: &InstallmentPlan,
        installment: &Installment,
    ) -> Result<Invoice> {
        let ctx = InstallmentContext {
            order,
            plan,
            installment,
        };
        let request = self.request(&ctx)?;
        let invoice = self.gateway.create_invoice(&request).await?;

        let recorded = self
            .installments
            .mark_invoiced(&installment.id, &invoice.id, invoice.url.as_deref())
            .await?;

        if !recorded {
            warn!(
                installment_id = %installment.id,
                invoice_id = %invoice.id,
                "Installment no longer pending, cancelling duplicate invoice"
            );
            if let Err(e) = self.gateway.cancel_invoice(&invoice.id).await {
                warn!(invoice_id = %invoice.id, error = %e, "Failed to cancel duplicate invoice");
            }
            return Err(AppError::validation(format!(
                "Installment {} is no longer pending",
                installment.id
            )));
        }

        info!(
            order_id = plan.order_id,
            installment_id = %installment.id,
            invoice_id = %invoice.id,
            amount = %installment.amount,
            "Installment invoice issued"
        );

        Ok(invoice)
    }
}
