pub mod order;

pub use order::{BillingContact, Order, OrderItem, OrderStatus, ProductInstallmentConfig};
