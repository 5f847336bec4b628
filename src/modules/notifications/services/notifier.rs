use async_trait::async_trait;
use tracing::info;

use crate::core::{AppError, Result};
use crate::modules::notifications::models::Notification;

/// Outbound message transport (mail, SMS)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the structured log instead of delivering them.
///
/// Used when no mail transport is wired in, and in development.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        if notification.recipient.is_empty() {
            return Err(AppError::validation(format!(
                "No recipient for {} notification",
                notification.kind.as_str()
            )));
        }

        info!(
            kind = notification.kind.as_str(),
            recipient = %notification.recipient,
            order_id = ?notification.order_id,
            installment_id = ?notification.installment_id,
            subject = %notification.subject,
            "Notification dispatched"
        );
        Ok(())
    }
}
