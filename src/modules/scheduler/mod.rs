pub mod controllers;
pub mod models;
pub mod services;

pub use models::{Job, JobReport};
pub use services::{JobRunner, SchedulerService};
