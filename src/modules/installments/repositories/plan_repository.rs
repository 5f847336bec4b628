use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlPool, Transaction};

use crate::core::{AppError, Currency, Result};
use crate::modules::installments::models::{Installment, InstallmentPlan, PlanSchedule, PlanStatus};

/// Persistence for installment plans
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Insert plans and all their installments in a single transaction
    async fn create_schedules(&self, schedules: &[PlanSchedule]) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<InstallmentPlan>>;

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<InstallmentPlan>>;

    async fn find_by_customer(&self, customer_id: u64) -> Result<Vec<InstallmentPlan>>;

    /// Move a plan to `to` if its current status is one of `from`.
    /// Sets `completed_at` when moving to completed.
    ///
    /// # Returns
    /// `true` when a row changed, `false` when the plan was already elsewhere
    async fn transition_status(&self, id: &str, from: &[PlanStatus], to: PlanStatus)
        -> Result<bool>;

    /// Delete a plan; installments cascade
    async fn delete(&self, id: &str) -> Result<()>;
}

/// MySQL implementation of [`PlanRepository`]
pub struct MySqlPlanRepository {
    pool: MySqlPool,
}

impl MySqlPlanRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn insert_plan(tx: &mut Transaction<'_, MySql>, plan: &InstallmentPlan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO installment_plans (
                id, order_id, customer_id, product_id, variation_id, total_amount,
                down_payment, installment_count, currency, status, created_at,
                updated_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&plan.id)
        .bind(plan.order_id)
        .bind(plan.customer_id)
        .bind(plan.product_id)
        .bind(plan.variation_id.unwrap_or(0))
        .bind(plan.total_amount)
        .bind(plan.down_payment)
        .bind(plan.installment_count)
        .bind(plan.currency.as_str())
        .bind(plan.status.as_str())
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .bind(plan.completed_at)
        .execute(tx.as_mut())
        .await
        .map_err(|e| AppError::Internal(format!("Failed to insert plan: {}", e)))?;

        Ok(())
    }

    async fn insert_installment(
        tx: &mut Transaction<'_, MySql>,
        installment: &Installment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO installments (
                id, plan_id, installment_number, amount, due_date, status,
                tap_invoice_id, invoice_url, reminder_sent, reminder_sent_at,
                paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&installment.id)
        .bind(&installment.plan_id)
        .bind(installment.installment_number)
        .bind(installment.amount)
        .bind(installment.due_date)
        .bind(installment.status.as_str())
        .bind(&installment.tap_invoice_id)
        .bind(&installment.invoice_url)
        .bind(installment.reminder_sent)
        .bind(installment.reminder_sent_at)
        .bind(installment.paid_at)
        .bind(installment.created_at)
        .bind(installment.updated_at)
        .execute(tx.as_mut())
        .await
        .map_err(|e| AppError::Internal(format!("Failed to insert installment: {}", e)))?;

        Ok(())
    }
}

const PLAN_COLUMNS: &str = "id, order_id, customer_id, product_id, variation_id, total_amount, \
     down_payment, installment_count, currency, status, created_at, updated_at, completed_at";

#[async_trait]
impl PlanRepository for MySqlPlanRepository {
    async fn create_schedules(&self, schedules: &[PlanSchedule]) -> Result<()> {
        if schedules.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        for schedule in schedules {
            Self::insert_plan(&mut tx, &schedule.plan).await?;
            for installment in &schedule.installments {
                Self::insert_installment(&mut tx, installment).await?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<InstallmentPlan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM installment_plans WHERE id = ?",
            PLAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch plan: {}", e)))?;

        row.map(InstallmentPlan::try_from).transpose()
    }

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<InstallmentPlan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM installment_plans WHERE order_id = ? ORDER BY created_at ASC",
            PLAN_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch plans: {}", e)))?;

        rows.into_iter().map(InstallmentPlan::try_from).collect()
    }

    async fn find_by_customer(&self, customer_id: u64) -> Result<Vec<InstallmentPlan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM installment_plans WHERE customer_id = ? ORDER BY created_at DESC",
            PLAN_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch customer plans: {}", e)))?;

        rows.into_iter().map(InstallmentPlan::try_from).collect()
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[PlanStatus],
        to: PlanStatus,
    ) -> Result<bool> {
        if from.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE installment_plans \
             SET status = ?, completed_at = IF(? = 'completed', CURRENT_TIMESTAMP, completed_at) \
             WHERE id = ? AND status IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(to.as_str()).bind(to.as_str()).bind(id);
        for status in from {
            query = query.bind(status.as_str());
        }

        let rows_affected = query
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to update plan status: {}", e)))?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM installment_plans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete plan: {}", e)))?;
        Ok(())
    }
}

/// Database row representation for installment_plans table
#[derive(sqlx::FromRow)]
struct PlanRow {
    id: String,
    order_id: u64,
    customer_id: u64,
    product_id: u64,
    variation_id: u64,
    total_amount: Decimal,
    down_payment: Decimal,
    installment_count: u32,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PlanRow> for InstallmentPlan {
    type Error = AppError;

    fn try_from(row: PlanRow) -> Result<Self> {
        let status = PlanStatus::try_from(row.status).map_err(AppError::Internal)?;
        let currency = Currency::try_from(row.currency).map_err(AppError::Internal)?;

        Ok(InstallmentPlan {
            id: row.id,
            order_id: row.order_id,
            customer_id: row.customer_id,
            product_id: row.product_id,
            variation_id: (row.variation_id != 0).then_some(row.variation_id),
            total_amount: row.total_amount,
            down_payment: row.down_payment,
            installment_count: row.installment_count,
            currency,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}
