pub mod order_store;
pub mod woocommerce;

pub use order_store::OrderStore;
pub use woocommerce::WooCommerceStore;
