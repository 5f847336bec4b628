use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use tracing::info;

use crate::core::dates::previous_month;
use crate::core::{AppError, Result};
use crate::modules::reports::models::{MonthlyReport, PaymentStats};
use crate::modules::reports::repositories::ReportRepository;

/// Service for admin reports
pub struct ReportService {
    report_repo: Arc<dyn ReportRepository>,
}

impl ReportService {
    pub fn new(report_repo: Arc<dyn ReportRepository>) -> Self {
        Self { report_repo }
    }

    /// Captured payment totals per currency
    ///
    /// # Errors
    /// `AppError::Validation` when `from` is after `to`
    pub async fn payment_stats(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<PaymentStats>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::validation(format!(
                    "from ({}) must be before or equal to to ({})",
                    from, to
                )));
            }
        }
        self.report_repo.payment_stats(from, to).await
    }

    /// Report for the calendar month starting at `month_start`
    pub async fn monthly_report(&self, month_start: NaiveDate, today: NaiveDate) -> Result<MonthlyReport> {
        let start = month_start
            .with_day(1)
            .ok_or_else(|| AppError::validation("Invalid month"))?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| AppError::validation("Month out of range"))?;

        let figures = self.report_repo.monthly_figures(start, end, today).await?;
        let report = MonthlyReport::new(start, end, figures);

        info!(
            period = %report.period,
            total_plans = report.total_plans,
            completed_plans = report.completed_plans,
            revenue = %report.total_revenue,
            "Monthly report generated"
        );

        Ok(report)
    }

    /// Report for the month before the one containing `today`
    pub async fn previous_month_report(&self, today: NaiveDate) -> Result<MonthlyReport> {
        let (start, _) = previous_month(today);
        self.monthly_report(start, today).await
    }
}

/// Parse a `YYYY-MM` month into its first day
pub fn parse_month(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!("Invalid month '{}'. Expected YYYY-MM", value))
    })
}
