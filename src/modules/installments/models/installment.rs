use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// One monthly installment of a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    pub id: String,
    pub plan_id: String,
    /// 1..=N, unique within the plan
    pub installment_number: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    /// Invoice issued at the payment API
    pub tap_invoice_id: Option<String>,
    /// Hosted invoice page for the customer
    pub invoice_url: Option<String>,
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Installment lifecycle: `pending` → `invoiced` → `paid` | `overdue` | `failed` | `cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    /// Invoice issued, awaiting payment
    Invoiced,
    Paid,
    Overdue,
    Failed,
    Cancelled,
}

impl InstallmentStatus {
    /// Statuses an invoice webhook may still move
    pub const OPEN: [InstallmentStatus; 3] = [
        InstallmentStatus::Pending,
        InstallmentStatus::Invoiced,
        InstallmentStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Invoiced => "invoiced",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for InstallmentStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "invoiced" => Ok(Self::Invoiced),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid installment status: {}", value)),
        }
    }
}

impl Installment {
    /// Create a pending installment
    pub fn new(
        plan_id: String,
        installment_number: u32,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Result<Self> {
        if installment_number < 1 {
            return Err(AppError::validation("Installment number starts at 1"));
        }

        if amount <= Decimal::ZERO {
            return Err(AppError::validation("Installment amount must be positive"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            plan_id,
            installment_number,
            amount,
            due_date,
            status: InstallmentStatus::Pending,
            tap_invoice_id: None,
            invoice_url: None,
            reminder_sent: false,
            reminder_sent_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Pending or overdue with the due date already past
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            InstallmentStatus::Pending | InstallmentStatus::Overdue
        ) && self.due_date < today
    }
}
