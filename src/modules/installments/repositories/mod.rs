pub mod installment_repository;
pub mod plan_repository;

pub use installment_repository::{InstallmentRepository, MySqlInstallmentRepository};
pub use plan_repository::{MySqlPlanRepository, PlanRepository};
