pub mod checkout_controller;
pub mod webhook_controller;
