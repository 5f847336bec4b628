pub mod installment_calculator;
pub mod installment_service;
pub mod invoice_issuer;
pub mod plan_builder;

pub use installment_calculator::{InstallmentBreakdown, InstallmentCalculator};
pub use installment_service::{InstallmentPreview, InstallmentService, PayNowResponse, PreviewQuery};
pub use invoice_issuer::InvoiceIssuer;
pub use plan_builder::{EligibleItem, PlanBuilder};
