//! Splitpay: installment (buy now, pay later) payments for a WooCommerce store
//! on the Tap payment API.
//!
//! Checkout charges a down payment and schedules monthly installments;
//! webhooks and periodic jobs invoice, reconcile and complete them.

pub mod app;
pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

pub use app::{AppServices, Collaborators, Repositories};
pub use modules::installments;
pub use modules::payments;
pub use modules::scheduler;
