pub mod scheduler_controller;

pub use scheduler_controller::configure_admin;
