use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::Currency;

/// Audit record of a charge at the payment API. Rows are appended, never deleted;
/// only `status` and `response_data` move as webhooks arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    /// None for down payments and regular order payments
    pub installment_id: Option<String>,
    pub order_id: u64,
    pub tap_charge_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    /// Raw API charge status
    pub status: String,
    pub payment_type: PaymentType,
    /// Last API body seen for this charge
    pub response_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Down payment or full order payment at checkout
    Initial,
    /// Paid through an installment invoice
    Installment,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Installment => "installment",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for PaymentType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "initial" => Ok(Self::Initial),
            "installment" => Ok(Self::Installment),
            _ => Err(format!("Invalid payment type: {}", value)),
        }
    }
}

/// Charge statuses the reconciliation logic acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Captured,
    Failed,
    Declined,
    Cancelled,
    /// Anything else (INITIATED, IN_PROGRESS, ...): recorded, no order transition
    Other,
}

impl ChargeStatus {
    /// API statuses after which a charge never moves again
    pub const TERMINAL: [&'static str; 8] = [
        "CAPTURED",
        "FAILED",
        "DECLINED",
        "CANCELLED",
        "RESTRICTED",
        "VOID",
        "TIMEDOUT",
        "ABANDONED",
    ];

    pub fn from_api(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "CAPTURED" => Self::Captured,
            "FAILED" => Self::Failed,
            "DECLINED" => Self::Declined,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other,
        }
    }

    pub fn is_terminal(status: &str) -> bool {
        let upper = status.trim().to_ascii_uppercase();
        Self::TERMINAL.contains(&upper.as_str())
    }
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: u64,
        installment_id: Option<String>,
        tap_charge_id: String,
        amount: Decimal,
        currency: Currency,
        status: &str,
        payment_type: PaymentType,
        response_data: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            installment_id,
            order_id,
            tap_charge_id,
            amount,
            currency,
            status: status.trim().to_ascii_uppercase(),
            payment_type,
            response_data,
            created_at: now,
            updated_at: now,
        }
    }
}
