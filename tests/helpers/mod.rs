// Shared fixtures for the integration and contract tests.
//
// Storage, the payment API, the host store and the mail transport are
// replaced by in-memory fakes behind the same traits the MySQL/Tap/WooCommerce
// implementations use, so every flow runs without external services.
// `test_database` provides a real MySQL database for the repository tests.
//
// Usage:
//   #[path = "../helpers/mod.rs"]
//   mod helpers;
//   use helpers::*;

#![allow(dead_code)]

pub mod memory_store;
pub mod test_database;

pub use fakes::*;
pub use fixtures::*;
pub use memory_store::*;
pub use test_database::*;
