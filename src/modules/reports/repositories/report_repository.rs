use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::reports::models::{MonthlyFigures, PaymentStats};

/// Aggregation queries for admin reports
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Captured payments grouped by currency, optionally bounded by creation date (inclusive)
    async fn payment_stats(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<PaymentStats>>;

    /// Plan and revenue figures for `start..=end`; overdue is measured at `today`
    async fn monthly_figures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<MonthlyFigures>;
}

pub struct MySqlReportRepository {
    pool: MySqlPool,
}

impl MySqlReportRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Exclusive upper bound for an inclusive end date
fn end_of(date: NaiveDate) -> NaiveDateTime {
    date.checked_add_days(Days::new(1))
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
}

/// MySQL returns `SUM` of booleans as DECIMAL
fn as_count(value: Option<Decimal>) -> u64 {
    value.and_then(|d| d.to_u64()).unwrap_or(0)
}

#[derive(sqlx::FromRow)]
struct PaymentStatsRow {
    currency: String,
    total_payments: i64,
    total_amount: Option<Decimal>,
    initial_payments: Option<Decimal>,
    installment_payments: Option<Decimal>,
    plans: i64,
}

impl From<PaymentStatsRow> for PaymentStats {
    fn from(row: PaymentStatsRow) -> Self {
        Self {
            currency: row.currency,
            total_payments: row.total_payments.max(0) as u64,
            total_amount: row.total_amount.unwrap_or(Decimal::ZERO),
            initial_payments: as_count(row.initial_payments),
            installment_payments: as_count(row.installment_payments),
            plans: row.plans.max(0) as u64,
        }
    }
}

#[async_trait]
impl ReportRepository for MySqlReportRepository {
    async fn payment_stats(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<PaymentStats>> {
        let rows = sqlx::query_as::<_, PaymentStatsRow>(
            r#"
            SELECT
                p.currency,
                COUNT(*) AS total_payments,
                SUM(p.amount) AS total_amount,
                SUM(p.payment_type = 'initial') AS initial_payments,
                SUM(p.payment_type = 'installment') AS installment_payments,
                COUNT(DISTINCT i.plan_id) AS plans
            FROM payments p
            LEFT JOIN installments i ON i.id = p.installment_id
            WHERE p.status = 'CAPTURED'
              AND (? IS NULL OR p.created_at >= ?)
              AND (? IS NULL OR p.created_at < ?)
            GROUP BY p.currency
            ORDER BY p.currency
            "#,
        )
        .bind(from.map(start_of))
        .bind(from.map(start_of))
        .bind(to.map(end_of))
        .bind(to.map(end_of))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to aggregate payments: {}", e)))?;

        Ok(rows.into_iter().map(PaymentStats::from).collect())
    }

    async fn monthly_figures(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<MonthlyFigures> {
        let (from, until) = (start_of(start), end_of(end));

        let (total_plans, completed_plans, active_plans): (i64, Option<Decimal>, Option<Decimal>) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(CASE WHEN created_at >= ? AND created_at < ? THEN 1 END),
                    SUM(status = 'completed' AND completed_at >= ? AND completed_at < ?),
                    SUM(status = 'active')
                FROM installment_plans
                "#,
            )
            .bind(from)
            .bind(until)
            .bind(from)
            .bind(until)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to aggregate plans: {}", e)))?;

        let (total_revenue,): (Option<Decimal>,) = sqlx::query_as(
            r#"
            SELECT SUM(amount) FROM payments
            WHERE status = 'CAPTURED' AND created_at >= ? AND created_at < ?
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to aggregate revenue: {}", e)))?;

        let (overdue_amount,): (Option<Decimal>,) = sqlx::query_as(
            r#"
            SELECT SUM(amount) FROM installments
            WHERE status IN ('pending', 'invoiced', 'overdue') AND due_date < ?
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to aggregate overdue: {}", e)))?;

        Ok(MonthlyFigures {
            total_plans: total_plans.max(0) as u64,
            completed_plans: as_count(completed_plans),
            total_revenue: total_revenue.unwrap_or(Decimal::ZERO),
            overdue_amount: overdue_amount.unwrap_or(Decimal::ZERO),
            active_plans: as_count(active_plans),
        })
    }
}
