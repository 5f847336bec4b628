use async_trait::async_trait;
use reqwest::{header, Client, Method};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::gateway_trait::{Charge, ChargeRequest, Invoice, InvoiceRequest, PaymentGateway};
use crate::config::TapConfig;
use crate::core::{AppError, Result};

/// Tap Payments REST client (charges and invoices)
pub struct TapClient {
    client: Client,
    config: TapConfig,
}

impl TapClient {
    pub fn new(config: TapConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn url_block(url: &Option<String>) -> Value {
        match url {
            Some(url) if !url.is_empty() => json!({ "url": url }),
            _ => json!({}),
        }
    }

    /// Wire body for `POST /charges` with merchant defaults filled in
    pub fn charge_body(&self, request: &ChargeRequest) -> Result<Value> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::validation("Amount must be greater than 0"));
        }
        if self.config.merchant_id.is_empty() {
            return Err(AppError::Configuration("Merchant ID is required".to_string()));
        }

        Ok(json!({
            "amount": request.currency.to_smallest_unit(request.amount),
            "currency": request.currency,
            "threeDSecure": true,
            "save_card": false,
            "description": request.description,
            "statement_descriptor": self.config.statement_descriptor,
            "metadata": request.metadata,
            "reference": {
                "transaction": format!("order_{}", request.order_id),
                "order": request.order_id.to_string(),
            },
            "receipt": { "email": false, "sms": false },
            "customer": request.customer,
            "merchant": { "id": self.config.merchant_id },
            "source": { "id": "src_all" },
            "post": Self::url_block(&request.post_url),
            "redirect": Self::url_block(&request.redirect_url),
        }))
    }

    /// Wire body for `POST /invoices`
    pub fn invoice_body(&self, request: &InvoiceRequest) -> Result<Value> {
        if self.config.merchant_id.is_empty() {
            return Err(AppError::Configuration("Merchant ID is required".to_string()));
        }
        if request.customer.email.is_empty() {
            return Err(AppError::validation("Customer information is required"));
        }
        if request.amount <= Decimal::ZERO {
            return Err(AppError::validation("Amount must be greater than 0"));
        }

        let amount = request.currency.to_smallest_unit(request.amount);

        Ok(json!({
            "draft": false,
            "due": request.due.format("%Y-%m-%d").to_string(),
            "expiry": request.expiry.format("%Y-%m-%d").to_string(),
            "description": request.description,
            "mode": "INVOICE",
            "note": request.note,
            "notifications": { "channels": ["EMAIL"], "dispatch": true },
            "currencies": [request.currency],
            "metadata": request.metadata,
            "charge": {
                "receipt": { "email": true, "sms": true },
                "statement_descriptor": self.config.statement_descriptor,
            },
            "customer": request.customer,
            "merchant": { "id": self.config.merchant_id },
            "order": {
                "amount": amount,
                "currency": request.currency,
                "items": [{
                    "amount": amount,
                    "currency": request.currency,
                    "description": request.item_description,
                    "discount": { "type": "F", "value": 0 },
                    "quantity": 1,
                }],
            },
            "post": Self::url_block(&request.post_url),
            "redirect": Self::url_block(&request.redirect_url),
        }))
    }

    /// Perform a request and decode the JSON body.
    /// Status >= 400 becomes `AppError::Gateway` with the API's `error.message`.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let secret_key = self.config.secret_key();
        if secret_key.is_empty() {
            return Err(AppError::Configuration(
                "Tap API key is not configured".to_string(),
            ));
        }

        let url = self.url(path);
        debug!(method = %method, url = %url, "Calling Tap API");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(secret_key)
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "Tap API request failed");
            AppError::Gateway(format!("Tap API request failed: {}", e))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to read Tap response: {}", e)))?;
        let decoded: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if status.as_u16() >= 400 {
            let message = decoded
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown API error")
                .to_string();
            error!(
                url = %url,
                status = status.as_u16(),
                response_body = %text,
                "Tap API returned an error"
            );
            return Err(AppError::Gateway(message));
        }

        Ok(decoded)
    }

    fn require_id(kind: &str, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(AppError::validation(format!("{} ID is required", kind)));
        }
        Ok(())
    }

    fn to_charge(body: Value) -> Result<Charge> {
        Charge::from_response(body)
            .ok_or_else(|| AppError::Gateway("Charge response missing id".to_string()))
    }

    fn to_invoice(body: Value) -> Result<Invoice> {
        Invoice::from_response(body)
            .ok_or_else(|| AppError::Gateway("Invoice response missing id".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for TapClient {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge> {
        let body = self.charge_body(request)?;
        let response = self.send(Method::POST, "charges", Some(&body)).await?;
        Self::to_charge(response)
    }

    async fn retrieve_charge(&self, charge_id: &str) -> Result<Charge> {
        Self::require_id("Charge", charge_id)?;
        let response = self
            .send(Method::GET, &format!("charges/{}", charge_id), None)
            .await?;
        Self::to_charge(response)
    }

    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice> {
        let body = self.invoice_body(request)?;
        let response = self.send(Method::POST, "invoices", Some(&body)).await?;
        Self::to_invoice(response)
    }

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<Invoice> {
        Self::require_id("Invoice", invoice_id)?;
        let response = self
            .send(Method::GET, &format!("invoices/{}", invoice_id), None)
            .await?;
        Self::to_invoice(response)
    }

    async fn cancel_invoice(&self, invoice_id: &str) -> Result<Invoice> {
        Self::require_id("Invoice", invoice_id)?;
        let response = self
            .send(Method::POST, &format!("invoices/{}/cancel", invoice_id), None)
            .await?;
        Self::to_invoice(response)
    }

    fn name(&self) -> &str {
        "tap"
    }
}
