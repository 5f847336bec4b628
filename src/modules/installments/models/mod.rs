pub mod installment;
pub mod installment_plan;
pub mod summary;

pub use installment::{Installment, InstallmentStatus};
pub use installment_plan::{InstallmentPlan, PlanSchedule, PlanStatus};
pub use summary::{CustomerSummary, PlanDetails, PlanProgress};
