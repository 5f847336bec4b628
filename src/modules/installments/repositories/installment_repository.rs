use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::installments::models::{Installment, InstallmentStatus};

/// Persistence for installments
///
/// Every status change is a conditional update: the row only moves when its
/// current status is one of the allowed sources, which keeps webhook and cron
/// reconciliation idempotent.
#[async_trait]
pub trait InstallmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Installment>>;

    /// Ordered by installment number
    async fn find_by_plan(&self, plan_id: &str) -> Result<Vec<Installment>>;

    async fn find_by_invoice_id(&self, tap_invoice_id: &str) -> Result<Option<Installment>>;

    /// Pending with `due_date <= date`
    async fn find_due(&self, date: NaiveDate) -> Result<Vec<Installment>>;

    /// Pending, not yet reminded, `from <= due_date <= until`
    async fn find_for_reminder(&self, from: NaiveDate, until: NaiveDate)
        -> Result<Vec<Installment>>;

    /// Pending with `due_date < today`
    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<Installment>>;

    /// pending → invoiced, storing the invoice reference
    async fn mark_invoiced(
        &self,
        id: &str,
        tap_invoice_id: &str,
        invoice_url: Option<&str>,
    ) -> Result<bool>;

    /// Move to `to` if currently in `from`; `paid_at` is set when moving to paid
    async fn transition_status(
        &self,
        id: &str,
        from: &[InstallmentStatus],
        to: InstallmentStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Flip the reminder flag once
    async fn mark_reminder_sent(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Installments of the plan that are not paid
    async fn count_unpaid(&self, plan_id: &str) -> Result<u64>;
}

/// MySQL implementation of [`InstallmentRepository`]
pub struct MySqlInstallmentRepository {
    pool: MySqlPool,
}

impl MySqlInstallmentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, binds: &[Bind<'_>]) -> Result<Vec<Installment>> {
        let mut query = sqlx::query_as::<_, InstallmentRow>(sql);
        for bind in binds {
            query = match bind {
                Bind::Str(s) => query.bind(*s),
                Bind::Date(d) => query.bind(*d),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch installments: {}", e)))?;

        rows.into_iter().map(Installment::try_from).collect()
    }
}

enum Bind<'a> {
    Str(&'a str),
    Date(NaiveDate),
}

const INSTALLMENT_COLUMNS: &str = "id, plan_id, installment_number, amount, due_date, status, \
     tap_invoice_id, invoice_url, reminder_sent, reminder_sent_at, paid_at, created_at, updated_at";

#[async_trait]
impl InstallmentRepository for MySqlInstallmentRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Installment>> {
        let sql = format!("SELECT {} FROM installments WHERE id = ?", INSTALLMENT_COLUMNS);
        Ok(self.fetch_many(&sql, &[Bind::Str(id)]).await?.into_iter().next())
    }

    async fn find_by_plan(&self, plan_id: &str) -> Result<Vec<Installment>> {
        let sql = format!(
            "SELECT {} FROM installments WHERE plan_id = ? ORDER BY installment_number ASC",
            INSTALLMENT_COLUMNS
        );
        self.fetch_many(&sql, &[Bind::Str(plan_id)]).await
    }

    async fn find_by_invoice_id(&self, tap_invoice_id: &str) -> Result<Option<Installment>> {
        let sql = format!(
            "SELECT {} FROM installments WHERE tap_invoice_id = ? LIMIT 1",
            INSTALLMENT_COLUMNS
        );
        Ok(self
            .fetch_many(&sql, &[Bind::Str(tap_invoice_id)])
            .await?
            .into_iter()
            .next())
    }

    async fn find_due(&self, date: NaiveDate) -> Result<Vec<Installment>> {
        let sql = format!(
            "SELECT {} FROM installments WHERE status = 'pending' AND due_date <= ? \
             ORDER BY due_date ASC, installment_number ASC",
            INSTALLMENT_COLUMNS
        );
        self.fetch_many(&sql, &[Bind::Date(date)]).await
    }

    async fn find_for_reminder(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Installment>> {
        let sql = format!(
            "SELECT {} FROM installments \
             WHERE status = 'pending' AND reminder_sent = FALSE AND due_date BETWEEN ? AND ? \
             ORDER BY due_date ASC",
            INSTALLMENT_COLUMNS
        );
        self.fetch_many(&sql, &[Bind::Date(from), Bind::Date(until)])
            .await
    }

    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<Installment>> {
        let sql = format!(
            "SELECT {} FROM installments WHERE status = 'pending' AND due_date < ? \
             ORDER BY due_date ASC",
            INSTALLMENT_COLUMNS
        );
        self.fetch_many(&sql, &[Bind::Date(today)]).await
    }

    async fn mark_invoiced(
        &self,
        id: &str,
        tap_invoice_id: &str,
        invoice_url: Option<&str>,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE installments
            SET status = 'invoiced', tap_invoice_id = ?, invoice_url = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(tap_invoice_id)
        .bind(invoice_url)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to mark installment invoiced: {}", e)))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[InstallmentStatus],
        to: InstallmentStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if from.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE installments SET status = ?, paid_at = IF(? = 'paid', ?, paid_at) \
             WHERE id = ? AND status IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(to.as_str())
            .bind(at)
            .bind(id);
        for status in from {
            query = query.bind(status.as_str());
        }

        let rows_affected = query
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to update installment status: {}", e))
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn mark_reminder_sent(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE installments
            SET reminder_sent = TRUE, reminder_sent_at = ?
            WHERE id = ? AND reminder_sent = FALSE
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to flag reminder: {}", e)))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn count_unpaid(&self, plan_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM installments WHERE plan_id = ? AND status <> 'paid'",
        )
        .bind(plan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to count unpaid installments: {}", e)))?;

        Ok(count.max(0) as u64)
    }
}

/// Database row representation for installments table
#[derive(sqlx::FromRow)]
struct InstallmentRow {
    id: String,
    plan_id: String,
    installment_number: u32,
    amount: Decimal,
    due_date: NaiveDate,
    status: String,
    tap_invoice_id: Option<String>,
    invoice_url: Option<String>,
    reminder_sent: bool,
    reminder_sent_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InstallmentRow> for Installment {
    type Error = AppError;

    fn try_from(row: InstallmentRow) -> Result<Self> {
        let status = InstallmentStatus::try_from(row.status).map_err(AppError::Internal)?;

        Ok(Installment {
            id: row.id,
            plan_id: row.plan_id,
            installment_number: row.installment_number,
            amount: row.amount,
            due_date: row.due_date,
            status,
            tap_invoice_id: row.tap_invoice_id,
            invoice_url: row.invoice_url,
            reminder_sent: row.reminder_sent,
            reminder_sent_at: row.reminder_sent_at,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
