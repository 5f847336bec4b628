pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Payment, PaymentType, WebhookEvent};
pub use repositories::PaymentRepository;
pub use services::{CheckoutOutcome, PaymentOrchestrator, WebhookHandler, WebhookOutcome};
