use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::parse_flag;
use crate::core::Currency;
use crate::modules::gateways::services::{GatewayCustomer, GatewayPhone};
use crate::modules::installments::services::installment_calculator::{coerce_count, coerce_decimal};

/// Host order as seen by the payment flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    /// 0 for guest checkouts
    pub customer_id: u64,
    pub status: OrderStatus,
    pub currency: Currency,
    pub total: Decimal,
    pub billing: BillingContact,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Country code used when the billing phone carries none
pub const DEFAULT_PHONE_COUNTRY_CODE: &str = "965";

impl BillingContact {
    /// Customer block for charges and invoices. Non-digits are stripped from the phone.
    pub fn to_gateway_customer(&self) -> GatewayCustomer {
        GatewayCustomer {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: GatewayPhone {
                country_code: DEFAULT_PHONE_COUNTRY_CODE.to_string(),
                number: self.phone.chars().filter(char::is_ascii_digit).collect(),
            },
        }
    }
}

/// One order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: u64,
    pub variation_id: Option<u64>,
    pub name: String,
    pub quantity: i64,
    /// Unit price charged today
    pub unit_price: Decimal,
    /// Line total after discounts
    pub line_total: Decimal,
}

/// Host order states this service moves orders between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }

    /// Payment has been received for the order
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "on-hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid order status: {}", value)),
        }
    }
}

/// Installment fields stored on a product or variation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInstallmentConfig {
    pub enabled: bool,
    /// Unit price over the whole plan
    pub full_amount: Decimal,
    /// None when the merchant left the field blank
    pub installment_count: Option<i64>,
}

impl ProductInstallmentConfig {
    /// Coerce raw meta values: `"yes"` enables, non-numeric amounts become zero
    pub fn from_meta(enabled: Option<&str>, full_amount: Option<&str>, count: Option<&str>) -> Self {
        Self {
            enabled: enabled.map(parse_flag).unwrap_or(false),
            full_amount: full_amount.map(coerce_decimal).unwrap_or(Decimal::ZERO),
            installment_count: count.map(coerce_count).filter(|c| *c > 0),
        }
    }

    /// Enabled with a usable full amount
    pub fn is_eligible(&self) -> bool {
        self.enabled && self.full_amount > Decimal::ZERO
    }

    /// Configured count, or `default` when blank
    pub fn count_or(&self, default: u32) -> i64 {
        self.installment_count.unwrap_or(i64::from(default))
    }
}
