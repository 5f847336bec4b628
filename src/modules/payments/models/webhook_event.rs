use serde::Serialize;
use serde_json::Value;

use crate::core::{AppError, Result};
use crate::modules::gateways::services::{Charge, Invoice};
use crate::modules::installments::models::InstallmentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookObject {
    Charge,
    Invoice,
}

/// Parsed webhook callback
///
/// Accepts both `{id, object, data: {...}}` and the flattened form where the
/// object fields sit at the top level.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// Charge or invoice id
    pub id: String,
    pub object: WebhookObject,
    /// Uppercased API status
    pub status: String,
    /// Charge attached to a paid invoice, if any
    pub charge_id: Option<String>,
    /// The object body (the `data` member when present)
    pub data: Value,
}

impl WebhookEvent {
    /// Parse and validate a raw webhook body.
    ///
    /// Empty bodies, invalid JSON, a missing `id`/`object` and unsupported
    /// object types are all `AppError::Validation`.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::validation("Empty payload"));
        }

        let payload: Value = serde_json::from_slice(body)
            .map_err(|_| AppError::validation("Invalid JSON payload"))?;
        if !payload.is_object() {
            return Err(AppError::validation("Invalid JSON payload"));
        }

        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Missing id"))?
            .to_string();

        let object = payload
            .get("object")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Missing object"))?;

        let object = match object.to_ascii_lowercase().as_str() {
            "charge" => WebhookObject::Charge,
            "invoice" => WebhookObject::Invoice,
            other => {
                return Err(AppError::validation(format!(
                    "Unsupported object type: {}",
                    other
                )))
            }
        };

        let data = match payload.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => payload.clone(),
        };

        let status = data
            .get("status")
            .or_else(|| payload.get("status"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();

        let charge_id = data
            .pointer("/charge/id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            id,
            object,
            status,
            charge_id,
            data,
        })
    }

    /// Event for a charge fetched from the API
    pub fn from_charge(charge: &Charge) -> Self {
        Self {
            id: charge.id.clone(),
            object: WebhookObject::Charge,
            status: charge.status.trim().to_ascii_uppercase(),
            charge_id: None,
            data: charge.raw.clone(),
        }
    }

    /// Event for an invoice fetched from the API
    pub fn from_invoice(invoice: &Invoice) -> Self {
        let charge_id = invoice
            .raw
            .pointer("/charge/id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            id: invoice.id.clone(),
            object: WebhookObject::Invoice,
            status: invoice.status.trim().to_ascii_uppercase(),
            charge_id,
            data: invoice.raw.clone(),
        }
    }

    /// Installment status an invoice status maps to
    pub fn invoice_target(&self) -> Option<InstallmentStatus> {
        match self.status.as_str() {
            "PAID" => Some(InstallmentStatus::Paid),
            "FAILED" | "EXPIRED" => Some(InstallmentStatus::Failed),
            "CANCELLED" => Some(InstallmentStatus::Cancelled),
            _ => None,
        }
    }
}
