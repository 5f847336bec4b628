pub mod job_runner;
pub mod scheduler_service;

pub use job_runner::JobRunner;
pub use scheduler_service::SchedulerService;
