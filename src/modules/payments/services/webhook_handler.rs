use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::Result;
use crate::modules::gateways::services::{signature, PaymentGateway};
use crate::modules::installments::models::{
    Installment, InstallmentPlan, InstallmentStatus, PlanStatus,
};
use crate::modules::installments::repositories::{InstallmentRepository, PlanRepository};
use crate::modules::notifications::models::{InstallmentContext, Notification};
use crate::modules::notifications::services::Notifier;
use crate::modules::orders::models::{Order, OrderStatus};
use crate::modules::orders::services::OrderStore;
use crate::modules::payments::models::{
    ChargeStatus, Payment, PaymentType, WebhookEvent, WebhookObject,
};
use crate::modules::payments::repositories::PaymentRepository;

/// What a webhook delivery did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// State moved and side effects ran
    Processed,
    /// Already in the reported state; nothing re-triggered
    Duplicate,
    /// No local record for the charge or invoice id
    NotFound,
    /// Status this service does not act on
    Ignored,
}

/// Reconciles charge and invoice status changes reported by the payment API.
///
/// Every transition is a conditional update, so concurrent or repeated
/// deliveries of the same event run side effects once. Follow-up work that
/// is safe to repeat (order payment, plan activation and completion, the
/// installment payment record) also runs on redelivery, so a delivery that
/// failed halfway is finished by the next one.
pub struct WebhookHandler {
    payments: Arc<dyn PaymentRepository>,
    plans: Arc<dyn PlanRepository>,
    installments: Arc<dyn InstallmentRepository>,
    orders: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    gateway: Arc<dyn PaymentGateway>,
    webhook_secret: String,
}

impl WebhookHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        plans: Arc<dyn PlanRepository>,
        installments: Arc<dyn InstallmentRepository>,
        orders: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        gateway: Arc<dyn PaymentGateway>,
        webhook_secret: String,
    ) -> Self {
        Self {
            payments,
            plans,
            installments,
            orders,
            notifier,
            gateway,
            webhook_secret,
        }
    }

    /// Verify, parse and apply a signed callback
    pub async fn on_webhook_received(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookOutcome> {
        signature::verify(&self.webhook_secret, body, signature_header)?;
        let event = WebhookEvent::parse(body)?;
        self.process(&event).await
    }

    /// Administrative reconciliation of one charge against its live API state
    pub async fn reconcile_charge(&self, charge_id: &str) -> Result<WebhookOutcome> {
        let charge = self.gateway.retrieve_charge(charge_id).await?;
        info!(charge_id, status = %charge.status, "Manual charge reconciliation");
        self.process(&WebhookEvent::from_charge(&charge)).await
    }

    /// Administrative reconciliation of one invoice against its live API state
    pub async fn reconcile_invoice(&self, invoice_id: &str) -> Result<WebhookOutcome> {
        let invoice = self.gateway.retrieve_invoice(invoice_id).await?;
        info!(invoice_id, status = %invoice.status, "Manual invoice reconciliation");
        self.process(&WebhookEvent::from_invoice(&invoice)).await
    }

    pub async fn process(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        match event.object {
            WebhookObject::Charge => self.process_charge(event).await,
            WebhookObject::Invoice => self.process_invoice(event).await,
        }
    }

    async fn process_charge(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let Some(payment) = self.payments.find_by_charge_id(&event.id).await? else {
            warn!(charge_id = %event.id, "Webhook for unknown charge: payment not found");
            return Ok(WebhookOutcome::NotFound);
        };
        let reported = ChargeStatus::from_api(&event.status);

        let changed = self
            .payments
            .update_status(&payment.id, &event.status, &event.data)
            .await?;
        if !changed {
            let captured_before = ChargeStatus::from_api(&payment.status) == ChargeStatus::Captured;
            if payment.payment_type == PaymentType::Initial
                && captured_before
                && reported == ChargeStatus::Captured
            {
                self.finish_capture(payment.order_id, &event.id).await?;
            }
            debug!(charge_id = %event.id, status = %event.status, "Charge already settled");
            return Ok(WebhookOutcome::Duplicate);
        }

        info!(
            order_id = payment.order_id,
            charge_id = %event.id,
            status = %event.status,
            "Charge status updated"
        );

        if payment.payment_type != PaymentType::Initial {
            return Ok(WebhookOutcome::Processed);
        }

        let order_id = payment.order_id;
        match reported {
            ChargeStatus::Captured => self.finish_capture(order_id, &event.id).await?,
            ChargeStatus::Failed | ChargeStatus::Declined => {
                self.orders
                    .update_status(
                        order_id,
                        OrderStatus::Failed,
                        &format!("Tap payment failed ({}). Charge ID: {}", event.status, event.id),
                    )
                    .await?;
            }
            ChargeStatus::Cancelled => {
                self.orders
                    .update_status(
                        order_id,
                        OrderStatus::Cancelled,
                        &format!("Tap payment cancelled. Charge ID: {}", event.id),
                    )
                    .await?;
            }
            ChargeStatus::Other => {}
        }

        Ok(WebhookOutcome::Processed)
    }

    /// Mark the order paid and activate its pending plans. Safe to repeat.
    async fn finish_capture(&self, order_id: u64, charge_id: &str) -> Result<()> {
        let order = self.orders.get_order(order_id).await?;
        if !order.status.is_paid() {
            self.orders.payment_complete(order_id, charge_id).await?;
            self.note(
                order_id,
                &format!("Tap payment completed. Charge ID: {}", charge_id),
            )
            .await;
        }

        for plan in self.plans.find_by_order(order_id).await? {
            if self
                .plans
                .transition_status(&plan.id, &[PlanStatus::Pending], PlanStatus::Active)
                .await?
            {
                info!(order_id, plan_id = %plan.id, "Installment plan activated");
            }
        }
        Ok(())
    }

    async fn process_invoice(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let Some(target) = event.invoice_target() else {
            debug!(invoice_id = %event.id, status = %event.status, "Invoice status ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(installment) = self.installments.find_by_invoice_id(&event.id).await? else {
            warn!(invoice_id = %event.id, "Webhook for unknown invoice: installment not found");
            return Ok(WebhookOutcome::NotFound);
        };

        if target == InstallmentStatus::Paid {
            return self.invoice_paid(event, installment).await;
        }

        let changed = self
            .installments
            .transition_status(&installment.id, &InstallmentStatus::OPEN, target, Utc::now())
            .await?;
        if !changed {
            debug!(
                installment_id = %installment.id,
                status = %installment.status,
                "Installment already settled"
            );
            return Ok(WebhookOutcome::Duplicate);
        }

        info!(
            installment_id = %installment.id,
            plan_id = %installment.plan_id,
            invoice_id = %event.id,
            status = %target,
            "Installment status updated"
        );
        self.installment_closed(&installment, target).await?;

        Ok(WebhookOutcome::Processed)
    }

    async fn invoice_paid(
        &self,
        event: &WebhookEvent,
        mut installment: Installment,
    ) -> Result<WebhookOutcome> {
        let Some(plan) = self.plans.find_by_id(&installment.plan_id).await? else {
            error!(plan_id = %installment.plan_id, "Paid installment has no plan");
            return Ok(WebhookOutcome::NotFound);
        };
        // Loaded before the transition: a store outage leaves the installment open
        let order = self.orders.get_order(plan.order_id).await?;

        let changed = self
            .installments
            .transition_status(
                &installment.id,
                &InstallmentStatus::OPEN,
                InstallmentStatus::Paid,
                Utc::now(),
            )
            .await?;

        if changed {
            info!(
                installment_id = %installment.id,
                plan_id = %plan.id,
                invoice_id = %event.id,
                "Installment paid"
            );
            installment.status = InstallmentStatus::Paid;
            self.note(
                order.id,
                &format!("Installment #{} paid", installment.installment_number),
            )
            .await;

            let ctx = InstallmentContext {
                order: &order,
                plan: &plan,
                installment: &installment,
            };
            self.notify(Notification::installment_paid(&ctx)).await;
        } else if installment.status != InstallmentStatus::Paid {
            debug!(
                installment_id = %installment.id,
                status = %installment.status,
                "Installment already settled"
            );
            return Ok(WebhookOutcome::Duplicate);
        }

        self.record_installment_payment(event, &plan, &installment)
            .await?;
        self.complete_plan_if_paid(&order, &plan).await?;

        Ok(if changed {
            WebhookOutcome::Processed
        } else {
            WebhookOutcome::Duplicate
        })
    }

    /// Append the charge behind a paid invoice, once per charge id
    async fn record_installment_payment(
        &self,
        event: &WebhookEvent,
        plan: &InstallmentPlan,
        installment: &Installment,
    ) -> Result<()> {
        let Some(charge_id) = &event.charge_id else {
            return Ok(());
        };
        if self.payments.find_by_charge_id(charge_id).await?.is_some() {
            return Ok(());
        }

        let payment = Payment::new(
            plan.order_id,
            Some(installment.id.clone()),
            charge_id.clone(),
            installment.amount,
            plan.currency,
            "CAPTURED",
            PaymentType::Installment,
            event.data.clone(),
        );
        self.payments.create(&payment).await
    }

    async fn complete_plan_if_paid(&self, order: &Order, plan: &InstallmentPlan) -> Result<()> {
        if self.installments.count_unpaid(&plan.id).await? > 0 {
            return Ok(());
        }

        let completed = self
            .plans
            .transition_status(
                &plan.id,
                &[PlanStatus::Pending, PlanStatus::Active],
                PlanStatus::Completed,
            )
            .await?;
        if completed {
            info!(order_id = order.id, plan_id = %plan.id, "Installment plan completed");
            self.note(order.id, "All installments completed").await;
            self.notify(Notification::plan_completed(order, plan)).await;
        }

        Ok(())
    }

    async fn installment_closed(&self, installment: &Installment, status: InstallmentStatus) -> Result<()> {
        if let Some(plan) = self.plans.find_by_id(&installment.plan_id).await? {
            self.note(
                plan.order_id,
                &format!(
                    "Installment #{} invoice {}",
                    installment.installment_number, status
                ),
            )
            .await;
        }
        Ok(())
    }

    /// Order notes are informational; a failure is logged, not propagated
    async fn note(&self, order_id: u64, note: &str) {
        if let Err(e) = self.orders.add_note(order_id, note).await {
            warn!(order_id, error = %e, "Failed to add order note");
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.send(&notification).await {
            warn!(
                kind = notification.kind.as_str(),
                order_id = ?notification.order_id,
                error = %e,
                "Failed to send notification"
            );
        }
    }
}
