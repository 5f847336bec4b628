use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::MySqlPool;

use crate::core::{AppError, Currency, Result};
use crate::modules::payments::models::{ChargeStatus, Payment, PaymentType};

/// Persistence for payment audit records
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<()>;

    /// Most recent payment for a charge id
    async fn find_by_charge_id(&self, tap_charge_id: &str) -> Result<Option<Payment>>;

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<Payment>>;

    /// Record a new API status. Only payments not yet in a terminal status move.
    ///
    /// # Returns
    /// `true` when the row changed
    async fn update_status(&self, id: &str, status: &str, response_data: &Value) -> Result<bool>;
}

/// MySQL implementation of [`PaymentRepository`]
pub struct MySqlPaymentRepository {
    pool: MySqlPool,
}

impl MySqlPaymentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = "id, installment_id, order_id, tap_charge_id, amount, currency, \
     status, payment_type, response_data, created_at, updated_at";

#[async_trait]
impl PaymentRepository for MySqlPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, installment_id, order_id, tap_charge_id, amount, currency,
                status, payment_type, response_data, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.installment_id)
        .bind(payment.order_id)
        .bind(&payment.tap_charge_id)
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(&payment.status)
        .bind(payment.payment_type.as_str())
        .bind(sqlx::types::Json(&payment.response_data))
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to insert payment: {}", e)))?;

        Ok(())
    }

    async fn find_by_charge_id(&self, tap_charge_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE tap_charge_id = ? ORDER BY created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(tap_charge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE order_id = ? ORDER BY created_at ASC",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payments: {}", e)))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn update_status(&self, id: &str, status: &str, response_data: &Value) -> Result<bool> {
        let placeholders = vec!["?"; ChargeStatus::TERMINAL.len()].join(", ");
        let sql = format!(
            "UPDATE payments SET status = ?, response_data = ? \
             WHERE id = ? AND status NOT IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(status.trim().to_ascii_uppercase())
            .bind(sqlx::types::Json(response_data))
            .bind(id);
        for terminal in ChargeStatus::TERMINAL {
            query = query.bind(terminal);
        }

        let rows_affected = query
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to update payment: {}", e)))?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

/// Database row representation for payments table
#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: String,
    installment_id: Option<String>,
    order_id: u64,
    tap_charge_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    payment_type: String,
    response_data: Option<sqlx::types::Json<Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Payment {
            id: row.id,
            installment_id: row.installment_id,
            order_id: row.order_id,
            tap_charge_id: row.tap_charge_id,
            amount: row.amount,
            currency: Currency::try_from(row.currency).map_err(AppError::Internal)?,
            status: row.status,
            payment_type: PaymentType::try_from(row.payment_type).map_err(AppError::Internal)?,
            response_data: row.response_data.map(|j| j.0).unwrap_or(Value::Null),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
