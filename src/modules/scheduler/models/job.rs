use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::core::AppError;

/// Periodic jobs; each can also be triggered by an administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    /// Daily: invoice installments that are due
    ProcessInstallments,
    /// Daily: remind customers of upcoming installments
    SendReminders,
    /// Weekly: notify customers of past-due installments
    OverdueNotifications,
    /// Monthly: email the previous month's figures to the admin
    MonthlyReport,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::ProcessInstallments,
        Job::SendReminders,
        Job::OverdueNotifications,
        Job::MonthlyReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessInstallments => "process_installments",
            Self::SendReminders => "send_reminders",
            Self::OverdueNotifications => "overdue_notifications",
            Self::MonthlyReport => "monthly_report",
        }
    }

    /// Whether the job should run on `today` given the date of its last run
    pub fn is_due(&self, last_run: Option<NaiveDate>, today: NaiveDate) -> bool {
        match self {
            Self::ProcessInstallments | Self::SendReminders => last_run != Some(today),
            Self::OverdueNotifications => {
                last_run.map_or(true, |last| (today - last).num_days() >= 7)
            }
            Self::MonthlyReport => last_run.map_or(today.day() == 1, |last| {
                (last.year(), last.month()) != (today.year(), today.month())
            }),
        }
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Job {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Job::ALL
            .into_iter()
            .find(|job| job.as_str() == s)
            .ok_or_else(|| AppError::not_found(format!("Unknown job: {}", s)))
    }
}

/// Outcome of one job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: Job,
    /// Items the job looked at
    pub total: usize,
    pub processed: usize,
    /// Items left alone (plan not active)
    pub skipped: usize,
    /// Items that failed; the batch continued past them
    pub errors: usize,
}

impl JobReport {
    pub fn new(job: Job, total: usize) -> Self {
        Self {
            job,
            total,
            processed: 0,
            skipped: 0,
            errors: 0,
        }
    }
}
