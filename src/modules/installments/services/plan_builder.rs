use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::InstallmentSettings;
use crate::core::dates::monthly_due_dates;
use crate::core::Result;
use crate::modules::installments::models::{Installment, InstallmentPlan, PlanSchedule, PlanStatus};
use crate::modules::installments::services::installment_calculator::{
    InstallmentBreakdown, InstallmentCalculator,
};
use crate::modules::orders::models::{Order, OrderItem};
use crate::modules::orders::services::OrderStore;

/// An order line that qualifies for an installment plan
#[derive(Debug, Clone)]
pub struct EligibleItem {
    pub item: OrderItem,
    pub breakdown: InstallmentBreakdown,
}

/// Turns order lines into installment schedules.
///
/// Shared by checkout and order completion so both produce identical figures.
pub struct PlanBuilder {
    orders: Arc<dyn OrderStore>,
    settings: InstallmentSettings,
}

impl PlanBuilder {
    pub fn new(orders: Arc<dyn OrderStore>, settings: InstallmentSettings) -> Self {
        Self { orders, settings }
    }

    pub fn settings(&self) -> &InstallmentSettings {
        &self.settings
    }

    /// Lines with installments enabled, each with its breakdown.
    ///
    /// An enabled line that cannot form a valid plan within the merchant
    /// limits is a validation error; nothing external has been called yet.
    pub async fn eligible_items(&self, order: &Order) -> Result<Vec<EligibleItem>> {
        if !self.settings.enabled {
            return Ok(Vec::new());
        }

        let mut eligible = Vec::new();
        for item in &order.items {
            let config = self
                .orders
                .product_installment_config(item.product_id, item.variation_id)
                .await?;

            if !config.is_eligible() {
                continue;
            }

            let breakdown = InstallmentCalculator::calculate(
                item.unit_price,
                config.full_amount,
                config.count_or(self.settings.default_count),
                item.quantity,
            )?;
            InstallmentCalculator::check_limits(&breakdown, &self.settings)?;

            debug!(
                order_id = order.id,
                product_id = item.product_id,
                down_payment = %breakdown.down_payment,
                installment_amount = %breakdown.installment_amount,
                installment_count = breakdown.installment_count,
                "Line item eligible for installments"
            );

            eligible.push(EligibleItem {
                item: item.clone(),
                breakdown,
            });
        }

        Ok(eligible)
    }

    /// One plan per eligible line, installments due monthly after `start`
    pub fn build_schedules(
        order: &Order,
        eligible: &[EligibleItem],
        status: PlanStatus,
        start: NaiveDate,
    ) -> Result<Vec<PlanSchedule>> {
        eligible
            .iter()
            .map(|entry| {
                let breakdown = &entry.breakdown;
                let plan = InstallmentPlan::new(
                    order.id,
                    order.customer_id,
                    entry.item.product_id,
                    entry.item.variation_id,
                    breakdown.total_amount(),
                    breakdown.down_payment,
                    breakdown.installment_count,
                    order.currency,
                    status,
                )?;

                let installments = monthly_due_dates(start, breakdown.installment_count)?
                    .into_iter()
                    .zip(1u32..)
                    .map(|(due, number)| {
                        Installment::new(plan.id.clone(), number, breakdown.installment_amount, due)
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(PlanSchedule { plan, installments })
            })
            .collect()
    }
}
