use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, info};

use crate::modules::scheduler::models::{Job, JobReport};
use crate::modules::scheduler::services::SchedulerService;

/// Wakes on a fixed interval and runs whichever jobs are due.
///
/// Last-run dates live in memory; after a restart daily and weekly jobs run
/// on the first tick, which is harmless since every job is idempotent.
pub struct JobRunner {
    scheduler: Arc<SchedulerService>,
    tick_interval: Duration,
    last_run: Mutex<HashMap<Job, NaiveDate>>,
}

impl JobRunner {
    pub fn new(scheduler: Arc<SchedulerService>, tick_interval: Duration) -> Self {
        Self {
            scheduler,
            tick_interval,
            last_run: Mutex::new(HashMap::new()),
        }
    }

    /// Start the background loop; spawn as a tokio task
    pub async fn start(self: Arc<Self>) {
        info!(
            interval_seconds = self.tick_interval.as_secs(),
            "Starting installment job runner"
        );

        let mut ticker = interval(self.tick_interval);
        loop {
            ticker.tick().await;
            self.on_scheduled_tick(Utc::now().date_naive()).await;
        }
    }

    /// Run every job due on `today`, in declaration order
    pub async fn on_scheduled_tick(&self, today: NaiveDate) -> Vec<JobReport> {
        let mut reports = Vec::new();

        for job in Job::ALL {
            let last = self.last_run.lock().await.get(&job).copied();
            if !job.is_due(last, today) {
                continue;
            }

            match self.scheduler.run(job, today).await {
                Ok(report) => {
                    self.last_run.lock().await.insert(job, today);
                    reports.push(report);
                }
                Err(e) => {
                    // Retried on the next tick
                    error!(job = %job, error = %e, "Scheduled job failed");
                }
            }
        }

        reports
    }
}
