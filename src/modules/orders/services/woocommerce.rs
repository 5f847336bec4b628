use async_trait::async_trait;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, error};

use super::order_store::OrderStore;
use crate::config::StoreConfig;
use crate::core::{AppError, Currency, Result};
use crate::modules::orders::models::{
    BillingContact, Order, OrderItem, OrderStatus, ProductInstallmentConfig,
};

pub const META_ENABLE_INSTALLMENT: &str = "_tap_enable_installment";
pub const META_FULL_AMOUNT: &str = "_tap_full_amount";
pub const META_INSTALLMENT_COUNT: &str = "_tap_installment_count";

/// WooCommerce REST API (`/wp-json/wc/v3`) adapter
pub struct WooCommerceStore {
    client: Client,
    config: StoreConfig,
}

impl WooCommerceStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/wp-json/wc/v3/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Calling store API");

        let mut request = self.client.request(method, &url).basic_auth(
            &self.config.consumer_key,
            Some(&self.config.consumer_secret),
        );
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "Store API request failed");
            AppError::Internal(format!("Store API request failed: {}", e))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("Store resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, status = status.as_u16(), response_body = %body, "Store API error");
            return Err(AppError::Internal(format!(
                "Store API error {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct WcOrder {
    id: u64,
    #[serde(default)]
    customer_id: u64,
    status: String,
    currency: String,
    total: Value,
    #[serde(default)]
    billing: WcBilling,
    #[serde(default)]
    line_items: Vec<WcLineItem>,
}

#[derive(Deserialize, Default)]
struct WcBilling {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
}

#[derive(Deserialize)]
struct WcLineItem {
    product_id: u64,
    #[serde(default)]
    variation_id: u64,
    #[serde(default)]
    name: String,
    quantity: i64,
    #[serde(default)]
    price: Value,
    #[serde(default)]
    total: Value,
}

#[derive(Deserialize)]
struct WcProduct {
    #[serde(default)]
    meta_data: Vec<WcMeta>,
}

#[derive(Deserialize)]
struct WcMeta {
    key: String,
    #[serde(default)]
    value: Value,
}

/// WooCommerce sends money both as JSON numbers and as strings
fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn meta_string(meta: &[WcMeta], key: &str) -> Option<String> {
    meta.iter().find(|m| m.key == key).map(|m| match &m.value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

impl TryFrom<WcOrder> for Order {
    type Error = AppError;

    fn try_from(wc: WcOrder) -> Result<Self> {
        let status = OrderStatus::try_from(wc.status).map_err(AppError::Internal)?;
        let currency = Currency::try_from(wc.currency).map_err(AppError::validation)?;

        let items = wc
            .line_items
            .into_iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                variation_id: (item.variation_id != 0).then_some(item.variation_id),
                name: item.name,
                quantity: item.quantity,
                unit_price: money(&item.price),
                line_total: money(&item.total),
            })
            .collect();

        Ok(Order {
            id: wc.id,
            customer_id: wc.customer_id,
            status,
            currency,
            total: money(&wc.total),
            billing: BillingContact {
                first_name: wc.billing.first_name,
                last_name: wc.billing.last_name,
                email: wc.billing.email,
                phone: wc.billing.phone,
            },
            items,
        })
    }
}

impl From<WcProduct> for ProductInstallmentConfig {
    fn from(product: WcProduct) -> Self {
        let meta = &product.meta_data;
        ProductInstallmentConfig::from_meta(
            meta_string(meta, META_ENABLE_INSTALLMENT).as_deref(),
            meta_string(meta, META_FULL_AMOUNT).as_deref(),
            meta_string(meta, META_INSTALLMENT_COUNT).as_deref(),
        )
    }
}

#[async_trait]
impl OrderStore for WooCommerceStore {
    async fn get_order(&self, order_id: u64) -> Result<Order> {
        let body = self
            .send(Method::GET, &format!("orders/{}", order_id), None)
            .await?;
        let wc: WcOrder = serde_json::from_value(body)?;
        Order::try_from(wc)
    }

    async fn product_installment_config(
        &self,
        product_id: u64,
        variation_id: Option<u64>,
    ) -> Result<ProductInstallmentConfig> {
        let path = match variation_id {
            Some(variation_id) => format!("products/{}/variations/{}", product_id, variation_id),
            None => format!("products/{}", product_id),
        };
        let body = self.send(Method::GET, &path, None).await?;
        let product: WcProduct = serde_json::from_value(body)?;
        Ok(product.into())
    }

    async fn update_status(&self, order_id: u64, status: OrderStatus, note: &str) -> Result<()> {
        self.send(
            Method::PUT,
            &format!("orders/{}", order_id),
            Some(json!({ "status": status.as_str() })),
        )
        .await?;
        if !note.is_empty() {
            self.add_note(order_id, note).await?;
        }
        Ok(())
    }

    async fn payment_complete(&self, order_id: u64, transaction_id: &str) -> Result<()> {
        self.send(
            Method::PUT,
            &format!("orders/{}", order_id),
            Some(json!({ "set_paid": true, "transaction_id": transaction_id })),
        )
        .await?;
        Ok(())
    }

    async fn add_note(&self, order_id: u64, note: &str) -> Result<()> {
        self.send(
            Method::POST,
            &format!("orders/{}/notes", order_id),
            Some(json!({ "note": note })),
        )
        .await?;
        Ok(())
    }
}
