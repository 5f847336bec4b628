pub mod notification;

pub use notification::{InstallmentContext, Notification, NotificationKind};
