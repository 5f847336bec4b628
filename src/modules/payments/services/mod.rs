pub mod payment_orchestrator;
pub mod webhook_handler;

pub use payment_orchestrator::{CheckoutOutcome, PaymentOrchestrator};
pub use webhook_handler::{WebhookHandler, WebhookOutcome};
