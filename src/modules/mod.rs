pub mod gateways;
pub mod health;
pub mod installments;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod scheduler;
