use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::config::RedirectConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::services::{ChargeRequest, PaymentGateway};
use crate::modules::installments::models::{PlanSchedule, PlanStatus};
use crate::modules::installments::repositories::{InstallmentRepository, PlanRepository};
use crate::modules::installments::services::plan_builder::{EligibleItem, PlanBuilder};
use crate::modules::orders::models::{Order, OrderStatus};
use crate::modules::orders::services::OrderStore;
use crate::modules::payments::models::{Payment, PaymentType};
use crate::modules::payments::repositories::PaymentRepository;

/// Result of the checkout payment step
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order_id: u64,
    pub charge_id: String,
    pub charge_status: String,
    /// Amount charged now: the order total, or the summed down payments
    pub amount: Decimal,
    /// Hosted payment page the buyer is sent to
    pub redirect_url: Option<String>,
    /// Empty for regular (non-installment) orders
    pub plans: Vec<PlanSchedule>,
}

/// Checkout and order-completion entry points
pub struct PaymentOrchestrator {
    plans: Arc<dyn PlanRepository>,
    installments: Arc<dyn InstallmentRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
    builder: PlanBuilder,
    redirects: RedirectConfig,
    webhook_url: String,
}

impl PaymentOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        installments: Arc<dyn InstallmentRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
        builder: PlanBuilder,
        redirects: RedirectConfig,
        webhook_url: String,
    ) -> Self {
        Self {
            plans,
            installments,
            payments,
            gateway,
            orders,
            builder,
            redirects,
            webhook_url,
        }
    }

    /// Charge an order at checkout.
    ///
    /// Orders with installment-eligible lines get one charge for the summed
    /// down payments and one pending plan per eligible line. Other orders are
    /// charged in full. When the charge fails nothing is persisted.
    pub async fn on_order_submit(&self, order_id: u64) -> Result<CheckoutOutcome> {
        let order = self.orders.get_order(order_id).await?;

        if !self.gateway.supports_currency(order.currency) {
            return Err(AppError::validation(format!(
                "Unsupported currency: {}",
                order.currency
            )));
        }

        let eligible = self.builder.eligible_items(&order).await?;

        if eligible.is_empty() {
            return self.charge_full_order(&order).await;
        }

        self.charge_down_payment(&order, &eligible).await
    }

    /// Create plans for an order paid outside checkout. Plans are created
    /// `active` since the payment is already complete, so the order must be
    /// processing or completed. Existing plans are returned untouched.
    pub async fn on_order_completed(&self, order_id: u64) -> Result<Vec<PlanSchedule>> {
        let existing = self.plans.find_by_order(order_id).await?;
        if !existing.is_empty() {
            info!(order_id, plans = existing.len(), "Order already has installment plans");
            let mut schedules = Vec::with_capacity(existing.len());
            for plan in existing {
                let installments = self.installments.find_by_plan(&plan.id).await?;
                schedules.push(PlanSchedule { plan, installments });
            }
            return Ok(schedules);
        }

        let order = self.orders.get_order(order_id).await?;
        if !order.status.is_paid() {
            warn!(order_id, status = %order.status, "Completion reported for unpaid order");
            return Err(AppError::validation(format!(
                "Order {} is {} and has not been paid",
                order_id, order.status
            )));
        }

        let eligible = self.builder.eligible_items(&order).await?;
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let schedules =
            PlanBuilder::build_schedules(&order, &eligible, PlanStatus::Active, today())?;
        self.plans.create_schedules(&schedules).await?;

        info!(order_id, plans = schedules.len(), "Installment plans created for completed order");
        self.orders
            .add_note(
                order_id,
                &format!("Installment plans created for {} item(s).", schedules.len()),
            )
            .await?;

        Ok(schedules)
    }

    async fn charge_full_order(&self, order: &Order) -> Result<CheckoutOutcome> {
        let request = self.charge_request(order, order.total, format!("Order #{}", order.id), false);

        let charge = self.gateway.create_charge(&request).await.map_err(|e| {
            error!(order_id = order.id, error = %e, "Order charge failed");
            e
        })?;

        info!(
            order_id = order.id,
            charge_id = %charge.id,
            amount = %order.total,
            "Order charge created"
        );

        let payment = Payment::new(
            order.id,
            None,
            charge.id.clone(),
            order.total,
            order.currency,
            &charge.status,
            PaymentType::Initial,
            charge.raw.clone(),
        );
        self.payments.create(&payment).await?;

        self.orders
            .update_status(order.id, OrderStatus::Pending, "Awaiting Tap payment confirmation.")
            .await?;

        Ok(CheckoutOutcome {
            order_id: order.id,
            charge_id: charge.id,
            charge_status: payment.status,
            amount: order.total,
            redirect_url: charge.transaction_url,
            plans: Vec::new(),
        })
    }

    async fn charge_down_payment(
        &self,
        order: &Order,
        eligible: &[EligibleItem],
    ) -> Result<CheckoutOutcome> {
        self.discard_pending_plans(order.id).await?;

        let down_payment: Decimal = eligible.iter().map(|e| e.breakdown.down_payment).sum();
        let schedules = PlanBuilder::build_schedules(order, eligible, PlanStatus::Pending, today())?;

        let request = self.charge_request(
            order,
            down_payment,
            format!("Down payment for Order #{}", order.id),
            true,
        );

        let charge = self.gateway.create_charge(&request).await.map_err(|e| {
            error!(order_id = order.id, error = %e, "Down payment charge failed");
            e
        })?;

        info!(
            order_id = order.id,
            charge_id = %charge.id,
            amount = %down_payment,
            plans = schedules.len(),
            "Down payment charge created"
        );

        self.plans.create_schedules(&schedules).await?;

        let payment = Payment::new(
            order.id,
            None,
            charge.id.clone(),
            down_payment,
            order.currency,
            &charge.status,
            PaymentType::Initial,
            charge.raw.clone(),
        );
        self.payments.create(&payment).await?;

        self.orders
            .update_status(
                order.id,
                OrderStatus::Pending,
                "Awaiting Tap down payment confirmation.",
            )
            .await?;

        Ok(CheckoutOutcome {
            order_id: order.id,
            charge_id: charge.id,
            charge_status: payment.status,
            amount: down_payment,
            redirect_url: charge.transaction_url,
            plans: schedules,
        })
    }

    /// Plans left behind by an earlier unconfirmed checkout attempt
    async fn discard_pending_plans(&self, order_id: u64) -> Result<()> {
        for plan in self.plans.find_by_order(order_id).await? {
            if plan.status != PlanStatus::Pending {
                return Err(AppError::validation(format!(
                    "Order #{} already has a {} installment plan",
                    order_id, plan.status
                )));
            }
            warn!(order_id, plan_id = %plan.id, "Discarding unconfirmed installment plan");
            self.plans.delete(&plan.id).await?;
        }
        Ok(())
    }

    fn charge_request(
        &self,
        order: &Order,
        amount: Decimal,
        description: String,
        installment: bool,
    ) -> ChargeRequest {
        let mut metadata = Map::new();
        metadata.insert("order_id".into(), json!(order.id));
        metadata.insert("installment_payment".into(), Value::Bool(installment));

        ChargeRequest {
            amount,
            currency: order.currency,
            description,
            order_id: order.id,
            customer: order.billing.to_gateway_customer(),
            metadata,
            redirect_url: self.redirect_url(order.id),
            post_url: Some(self.webhook_url.clone()).filter(|u| !u.is_empty()),
        }
    }

    fn redirect_url(&self, order_id: u64) -> Option<String> {
        let base = self.redirects.success_url.trim();
        if base.is_empty() {
            return None;
        }
        let separator = if base.contains('?') { '&' } else { '?' };
        Some(format!("{}{}order_id={}", base, separator, order_id))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
