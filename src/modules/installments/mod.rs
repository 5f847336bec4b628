pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Installment, InstallmentPlan, InstallmentStatus, PlanStatus};
pub use repositories::{InstallmentRepository, PlanRepository};
pub use services::{InstallmentCalculator, InstallmentService};
