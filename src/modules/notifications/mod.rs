pub mod models;
pub mod services;

pub use models::{InstallmentContext, Notification, NotificationKind};
pub use services::{LogNotifier, Notifier};
