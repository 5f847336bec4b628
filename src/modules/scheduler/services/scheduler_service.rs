use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::core::dates::days_overdue;
use crate::core::{AppError, Result};
use crate::modules::installments::models::{Installment, InstallmentPlan, PlanStatus};
use crate::modules::installments::repositories::{InstallmentRepository, PlanRepository};
use crate::modules::installments::services::InvoiceIssuer;
use crate::modules::notifications::models::{InstallmentContext, Notification};
use crate::modules::notifications::services::Notifier;
use crate::modules::orders::models::Order;
use crate::modules::orders::services::OrderStore;
use crate::modules::reports::services::ReportService;
use crate::modules::scheduler::models::{Job, JobReport};

/// Batch jobs over installments. Items are processed one at a time and a
/// failing item never aborts the batch.
pub struct SchedulerService {
    plans: Arc<dyn PlanRepository>,
    installments: Arc<dyn InstallmentRepository>,
    orders: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    issuer: Arc<InvoiceIssuer>,
    reports: Arc<ReportService>,
    config: SchedulerConfig,
    admin_email: String,
}

/// Whether an item was acted on or left alone
enum ItemOutcome {
    Processed,
    Skipped,
}

impl SchedulerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        installments: Arc<dyn InstallmentRepository>,
        orders: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        issuer: Arc<InvoiceIssuer>,
        reports: Arc<ReportService>,
        config: SchedulerConfig,
        admin_email: String,
    ) -> Self {
        Self {
            plans,
            installments,
            orders,
            notifier,
            issuer,
            reports,
            config,
            admin_email,
        }
    }

    pub async fn run(&self, job: Job, today: NaiveDate) -> Result<JobReport> {
        let report = match job {
            Job::ProcessInstallments => self.process_due_installments(today).await?,
            Job::SendReminders => self.send_payment_reminders(today).await?,
            Job::OverdueNotifications => self.send_overdue_notifications(today).await?,
            Job::MonthlyReport => self.generate_monthly_report(today).await?,
        };

        info!(
            job = %report.job,
            total = report.total,
            processed = report.processed,
            skipped = report.skipped,
            errors = report.errors,
            "Scheduled job finished"
        );
        Ok(report)
    }

    /// Plan and order an installment belongs to; None when the plan is not active
    async fn context_for(&self, installment: &Installment) -> Result<Option<(InstallmentPlan, Order)>> {
        let plan = self
            .plans
            .find_by_id(&installment.plan_id)
            .await?
            .ok_or_else(|| {
                AppError::internal(format!("Plan {} missing for installment", installment.plan_id))
            })?;

        if plan.status != PlanStatus::Active {
            return Ok(None);
        }

        let order = self.orders.get_order(plan.order_id).await?;
        Ok(Some((plan, order)))
    }

    fn tally(report: &mut JobReport, installment: &Installment, outcome: Result<ItemOutcome>) {
        match outcome {
            Ok(ItemOutcome::Processed) => report.processed += 1,
            Ok(ItemOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                report.errors += 1;
                error!(
                    job = %report.job,
                    installment_id = %installment.id,
                    plan_id = %installment.plan_id,
                    error = %e,
                    "Installment failed, continuing batch"
                );
            }
        }
    }

    /// Invoice every pending installment due on or before `today`
    pub async fn process_due_installments(&self, today: NaiveDate) -> Result<JobReport> {
        let due = self.installments.find_due(today).await?;
        let mut report = JobReport::new(Job::ProcessInstallments, due.len());

        for (index, installment) in due.iter().enumerate() {
            if index > 0 && !self.config.invoice_delay.is_zero() {
                sleep(self.config.invoice_delay).await;
            }
            let outcome = self.invoice_installment(installment).await;
            Self::tally(&mut report, installment, outcome);
        }

        Ok(report)
    }

    async fn invoice_installment(&self, installment: &Installment) -> Result<ItemOutcome> {
        let Some((plan, order)) = self.context_for(installment).await? else {
            return Ok(ItemOutcome::Skipped);
        };

        let invoice = self.issuer.issue(&order, &plan, installment).await?;

        let ctx = InstallmentContext {
            order: &order,
            plan: &plan,
            installment,
        };
        let url = invoice.url.as_deref().unwrap_or_default();
        if let Err(e) = self.notifier.send(&Notification::invoice_issued(&ctx, url)).await {
            warn!(installment_id = %installment.id, error = %e, "Invoice email not sent");
        }

        Ok(ItemOutcome::Processed)
    }

    /// Remind once for every pending installment due within the reminder window
    pub async fn send_payment_reminders(&self, today: NaiveDate) -> Result<JobReport> {
        let until = today
            .checked_add_days(Days::new(u64::from(self.config.reminder_days)))
            .unwrap_or(today);
        let upcoming = self.installments.find_for_reminder(today, until).await?;
        let mut report = JobReport::new(Job::SendReminders, upcoming.len());

        for installment in &upcoming {
            let outcome = self.remind(installment).await;
            Self::tally(&mut report, installment, outcome);
        }

        Ok(report)
    }

    async fn remind(&self, installment: &Installment) -> Result<ItemOutcome> {
        let Some((plan, order)) = self.context_for(installment).await? else {
            return Ok(ItemOutcome::Skipped);
        };

        let ctx = InstallmentContext {
            order: &order,
            plan: &plan,
            installment,
        };
        self.notifier.send(&Notification::payment_reminder(&ctx)).await?;
        self.installments
            .mark_reminder_sent(&installment.id, Utc::now())
            .await?;

        Ok(ItemOutcome::Processed)
    }

    /// Notify for every pending installment past due. Statuses are not changed.
    pub async fn send_overdue_notifications(&self, today: NaiveDate) -> Result<JobReport> {
        let overdue = self.installments.find_overdue(today).await?;
        let mut report = JobReport::new(Job::OverdueNotifications, overdue.len());

        for installment in &overdue {
            let outcome = self.notify_overdue(installment, today).await;
            Self::tally(&mut report, installment, outcome);
        }

        Ok(report)
    }

    async fn notify_overdue(&self, installment: &Installment, today: NaiveDate) -> Result<ItemOutcome> {
        let Some((plan, order)) = self.context_for(installment).await? else {
            return Ok(ItemOutcome::Skipped);
        };

        let ctx = InstallmentContext {
            order: &order,
            plan: &plan,
            installment,
        };
        let days = days_overdue(installment.due_date, today);
        self.notifier
            .send(&Notification::overdue_notice(&ctx, days))
            .await?;

        Ok(ItemOutcome::Processed)
    }

    /// Previous month's figures, emailed to the admin address
    pub async fn generate_monthly_report(&self, today: NaiveDate) -> Result<JobReport> {
        let mut report = JobReport::new(Job::MonthlyReport, 1);
        let monthly = self.reports.previous_month_report(today).await?;

        match self
            .notifier
            .send(&Notification::monthly_report(&self.admin_email, &monthly))
            .await
        {
            Ok(()) => report.processed = 1,
            Err(e) => {
                report.errors = 1;
                error!(period = %monthly.period, error = %e, "Monthly report email failed");
            }
        }

        Ok(report)
    }
}
