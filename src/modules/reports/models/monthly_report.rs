use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::dates::month_label;

/// Raw plan/revenue figures for a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    /// Plans created in the period
    pub total_plans: u64,
    /// Plans completed in the period
    pub completed_plans: u64,
    /// Captured payments (down payments and installments) in the period
    pub total_revenue: Decimal,
    /// Open installments past due, as of the report date
    pub overdue_amount: Decimal,
    /// Plans currently active
    pub active_plans: u64,
}

/// Monthly summary emailed to the store administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    /// "March 2026"
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_plans: u64,
    pub completed_plans: u64,
    pub total_revenue: Decimal,
    pub overdue_amount: Decimal,
    pub active_plans: u64,
}

impl MonthlyReport {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, figures: MonthlyFigures) -> Self {
        Self {
            period: month_label(start_date),
            start_date,
            end_date,
            total_plans: figures.total_plans,
            completed_plans: figures.completed_plans,
            total_revenue: figures.total_revenue,
            overdue_amount: figures.overdue_amount,
            active_plans: figures.active_plans,
        }
    }
}

/// Captured payment totals for one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
    pub currency: String,
    pub total_payments: u64,
    pub total_amount: Decimal,
    pub initial_payments: u64,
    pub installment_payments: u64,
    /// Distinct plans with at least one installment payment
    pub plans: u64,
}
