use async_trait::async_trait;

use crate::core::Result;
use crate::modules::orders::models::{Order, OrderStatus, ProductInstallmentConfig};

/// Host e-commerce platform: orders, product installment fields, order notes
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: u64) -> Result<Order>;

    /// Installment fields of the variation when given, otherwise of the product
    async fn product_installment_config(
        &self,
        product_id: u64,
        variation_id: Option<u64>,
    ) -> Result<ProductInstallmentConfig>;

    /// Move the order to `status`, recording `note` on the order
    async fn update_status(&self, order_id: u64, status: OrderStatus, note: &str) -> Result<()>;

    /// Mark the order paid with the external transaction id
    async fn payment_complete(&self, order_id: u64, transaction_id: &str) -> Result<()>;

    async fn add_note(&self, order_id: u64, note: &str) -> Result<()>;
}
