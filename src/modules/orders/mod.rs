pub mod models;
pub mod services;

pub use models::{BillingContact, Order, OrderItem, OrderStatus, ProductInstallmentConfig};
pub use services::{OrderStore, WooCommerceStore};
