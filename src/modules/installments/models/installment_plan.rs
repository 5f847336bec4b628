use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Currency, Result};

use super::installment::Installment;

/// Installment plan for one eligible order line item
///
/// The customer pays `down_payment` at checkout and the rest through
/// `installment_count` monthly invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub id: String,
    pub order_id: u64,
    pub customer_id: u64,
    pub product_id: u64,
    /// None for simple products
    pub variation_id: Option<u64>,
    /// Full (non-discounted) amount for the line: `full_amount * quantity`
    pub total_amount: Decimal,
    /// Charged immediately: `current_price * quantity`
    pub down_payment: Decimal,
    pub installment_count: u32,
    pub currency: Currency,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Plan lifecycle: `pending` → `active` → `completed`; `cancelled` only by admin action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Schedule persisted, down payment not yet captured
    Pending,
    /// Down payment captured, installments being collected
    Active,
    /// Every installment paid
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for PlanStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid plan status: {}", value)),
        }
    }
}

impl InstallmentPlan {
    /// Build a new plan
    ///
    /// # Arguments
    /// * `order_id` - Host order
    /// * `customer_id` - Host customer (0 for guests)
    /// * `product_id` / `variation_id` - Line item product
    /// * `total_amount` - Full amount for the line
    /// * `down_payment` - Amount charged at checkout
    /// * `installment_count` - Number of monthly installments (>= 2)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: u64,
        customer_id: u64,
        product_id: u64,
        variation_id: Option<u64>,
        total_amount: Decimal,
        down_payment: Decimal,
        installment_count: u32,
        currency: Currency,
        status: PlanStatus,
    ) -> Result<Self> {
        if installment_count < 2 {
            return Err(AppError::validation(format!(
                "Installment count must be at least 2, got {}",
                installment_count
            )));
        }

        if down_payment >= total_amount {
            return Err(AppError::validation(format!(
                "Down payment ({}) must be less than total amount ({})",
                down_payment, total_amount
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            order_id,
            customer_id,
            product_id,
            variation_id: variation_id.filter(|v| *v != 0),
            total_amount,
            down_payment,
            installment_count,
            currency,
            status,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Amount still to be collected through installments
    pub fn remaining_amount(&self) -> Decimal {
        self.total_amount - self.down_payment
    }
}

/// A plan together with its full installment schedule; persisted atomically
#[derive(Debug, Clone, Serialize)]
pub struct PlanSchedule {
    pub plan: InstallmentPlan,
    pub installments: Vec<Installment>,
}
