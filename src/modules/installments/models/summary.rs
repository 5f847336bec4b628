use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::{Installment, InstallmentPlan, InstallmentStatus, PlanStatus};

/// Paid-count progress of a plan
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanProgress {
    pub paid_count: u32,
    pub total_count: u32,
    /// 0..=100, two decimals
    pub percentage: Decimal,
}

impl PlanProgress {
    pub fn from_installments(installments: &[Installment]) -> Self {
        let total_count = installments.len() as u32;
        let paid_count = installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Paid)
            .count() as u32;

        let percentage = if total_count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(paid_count) * Decimal::ONE_HUNDRED / Decimal::from(total_count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        Self {
            paid_count,
            total_count,
            percentage,
        }
    }
}

/// Plan with its schedule and derived dashboard figures
#[derive(Debug, Clone, Serialize)]
pub struct PlanDetails {
    pub plan: InstallmentPlan,
    pub installments: Vec<Installment>,
    pub progress: PlanProgress,
    /// Sum of installments still open (pending, invoiced, overdue)
    pub remaining_amount: Decimal,
    pub overdue_amount: Decimal,
    pub has_overdue: bool,
    pub next_installment: Option<Installment>,
}

impl PlanDetails {
    pub fn build(plan: InstallmentPlan, mut installments: Vec<Installment>, today: NaiveDate) -> Self {
        installments.sort_by_key(|i| i.installment_number);

        let open: Vec<&Installment> = installments
            .iter()
            .filter(|i| InstallmentStatus::OPEN.contains(&i.status))
            .collect();

        let remaining_amount = open.iter().map(|i| i.amount).sum();
        let overdue_amount: Decimal = open
            .iter()
            .filter(|i| i.due_date < today)
            .map(|i| i.amount)
            .sum();
        let next_installment = open.iter().min_by_key(|i| i.due_date).map(|i| (*i).clone());
        let progress = PlanProgress::from_installments(&installments);

        Self {
            plan,
            progress,
            remaining_amount,
            has_overdue: overdue_amount > Decimal::ZERO,
            overdue_amount,
            next_installment,
            installments,
        }
    }
}

/// "My installments" dashboard for one customer
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub customer_id: u64,
    pub total_plans: u32,
    pub active_plans: u32,
    pub completed_plans: u32,
    pub total_remaining: Decimal,
    pub overdue_amount: Decimal,
    pub next_payment_date: Option<NaiveDate>,
    pub next_payment_amount: Option<Decimal>,
    pub plans: Vec<PlanDetails>,
}

impl CustomerSummary {
    pub fn build(customer_id: u64, plans: Vec<PlanDetails>) -> Self {
        let count = |status: PlanStatus| plans.iter().filter(|p| p.plan.status == status).count() as u32;

        // Cancelled plans no longer owe anything
        let live = || plans.iter().filter(|p| p.plan.status != PlanStatus::Cancelled);

        let next = live()
            .filter_map(|p| p.next_installment.as_ref())
            .min_by_key(|i| i.due_date);

        Self {
            customer_id,
            total_plans: plans.len() as u32,
            active_plans: count(PlanStatus::Active),
            completed_plans: count(PlanStatus::Completed),
            total_remaining: live().map(|p| p.remaining_amount).sum(),
            overdue_amount: live().map(|p| p.overdue_amount).sum(),
            next_payment_date: next.map(|i| i.due_date),
            next_payment_amount: next.map(|i| i.amount),
            plans,
        }
    }
}
