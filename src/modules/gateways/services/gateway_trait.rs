use crate::core::{Currency, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outbound payment API: charges and invoices
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a charge; the customer completes it on the hosted page
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge>;

    /// Live charge state, used for manual reconciliation
    async fn retrieve_charge(&self, charge_id: &str) -> Result<Charge>;

    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice>;

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<Invoice>;

    async fn cancel_invoice(&self, invoice_id: &str) -> Result<Invoice>;

    /// Get gateway name
    fn name(&self) -> &str;

    fn supports_currency(&self, currency: Currency) -> bool {
        Currency::ALL.contains(&currency)
    }
}

/// Customer block sent with charges and invoices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: GatewayPhone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPhone {
    pub country_code: String,
    pub number: String,
}

/// Charge to create. Merchant, descriptor and source defaults are added by the client.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Major units; converted to the smallest unit on the wire
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    /// Host order this charge pays for; becomes the `reference`
    pub order_id: u64,
    pub customer: GatewayCustomer,
    pub metadata: Map<String, Value>,
    /// Customer landing page after payment
    pub redirect_url: Option<String>,
    /// Webhook target
    pub post_url: Option<String>,
}

/// Invoice to create for one installment
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    pub amount: Decimal,
    pub currency: Currency,
    pub due: NaiveDate,
    pub expiry: NaiveDate,
    pub description: String,
    pub note: String,
    /// Line description inside `order.items[]`
    pub item_description: String,
    pub customer: GatewayCustomer,
    pub metadata: Map<String, Value>,
    pub redirect_url: Option<String>,
    pub post_url: Option<String>,
}

/// Charge as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    /// Raw API status (`INITIATED`, `CAPTURED`, `FAILED`, ...)
    pub status: String,
    /// Hosted payment page, present on freshly created charges
    #[serde(default)]
    pub transaction_url: Option<String>,
    /// Full response body
    #[serde(default)]
    pub raw: Value,
}

impl Charge {
    /// Read the fields we care about from an API response body
    pub fn from_response(body: Value) -> Option<Self> {
        let id = body.get("id")?.as_str()?.to_string();
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let transaction_url = body
            .pointer("/transaction/url")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            id,
            status,
            transaction_url,
            raw: body,
        })
    }
}

/// Invoice as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub status: String,
    /// Hosted invoice page
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub raw: Value,
}

impl Invoice {
    pub fn from_response(body: Value) -> Option<Self> {
        let id = body.get("id")?.as_str()?.to_string();
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let url = body
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            id,
            status,
            url,
            raw: body,
        })
    }
}
