pub mod payment;
pub mod webhook_event;

pub use payment::{ChargeStatus, Payment, PaymentType};
pub use webhook_event::{WebhookEvent, WebhookObject};
