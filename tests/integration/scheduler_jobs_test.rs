// Scheduled jobs: invoicing, reminders, overdue notices, monthly report

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use rust_decimal_macros::dec;
use serde_json::json;

use helpers::*;
use splitpay::modules::installments::models::{Installment, InstallmentStatus};
use splitpay::modules::notifications::models::NotificationKind;
use splitpay::modules::scheduler::{Job, JobRunner};

/// Check out `order_id` and, when `captured` is set, confirm the down payment
async fn checkout(app: &TestApp, order_id: u64, captured: bool) {
    let outcome = app
        .services
        .orchestrator
        .on_order_submit(order_id)
        .await
        .expect("checkout");

    if captured {
        capture(app, &outcome.charge_id).await;
    }
}

/// First installment of each plan, ordered by plan
fn first_installments(app: &TestApp) -> Vec<Installment> {
    app.store
        .installments()
        .into_iter()
        .filter(|i| i.installment_number == 1)
        .collect()
}

fn day_after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap()
}

fn day_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap()
}

#[tokio::test]
async fn test_due_installments_are_invoiced_once() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, true).await;
    let first = first_installments(&app).remove(0);

    let report = app
        .services
        .scheduler
        .run(Job::ProcessInstallments, first.due_date)
        .await
        .unwrap();

    assert_eq!((report.total, report.processed, report.errors), (1, 1, 0));
    assert_eq!(app.gateway.invoice_count(), 1);

    let invoiced = app.store.installment(&first.id);
    assert_eq!(invoiced.status, InstallmentStatus::Invoiced);
    assert!(invoiced.tap_invoice_id.is_some());
    assert!(invoiced.invoice_url.is_some());
    assert_eq!(app.notifier.count(NotificationKind::InvoiceIssued), 1);

    let request = app.gateway.invoices.lock().unwrap()[0].clone();
    assert_eq!(request.amount, dec!(10.00));
    assert_eq!(request.due, first.due_date);
    assert_eq!(
        request.expiry,
        day_after(first.due_date, u64::from(app.config.scheduler.invoice_expiry_days))
    );
    assert_eq!(request.description, "Installment 1 of 3 for Product 11");
    assert_eq!(request.metadata["installment_id"], json!(first.id));

    // The next run finds nothing pending for that date
    let report = app
        .services
        .scheduler
        .run(Job::ProcessInstallments, first.due_date)
        .await
        .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(app.gateway.invoice_count(), 1);
}

#[tokio::test]
async fn test_missed_days_are_caught_up() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, true).await;
    let first = first_installments(&app).remove(0);

    // Two months late: installments 1 and 2 are both due
    let late = day_after(first.due_date, 31);
    let report = app
        .services
        .scheduler
        .run(Job::ProcessInstallments, late)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.processed, 2);
}

#[tokio::test]
async fn test_failing_item_does_not_abort_batch() {
    let app = TestApp::new().with_installment_order();
    app.orders
        .set_product_config(12, installment_config(dec!(80), Some(3)));
    app.orders
        .insert_order(order(2002, 8, vec![order_item(12, dec!(50), 1)]));
    checkout(&app, 1001, true).await;
    checkout(&app, 2002, true).await;

    let firsts = first_installments(&app);
    assert_eq!(firsts.len(), 2);
    app.gateway.fail_invoices_for(&firsts[0].id);

    let report = app
        .services
        .scheduler
        .run(Job::ProcessInstallments, firsts[0].due_date)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(
        app.store.installment(&firsts[0].id).status,
        InstallmentStatus::Pending
    );
    assert_eq!(
        app.store.installment(&firsts[1].id).status,
        InstallmentStatus::Invoiced
    );
}

#[tokio::test]
async fn test_installments_of_unconfirmed_plans_are_skipped() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, false).await;
    let first = first_installments(&app).remove(0);

    let report = app
        .services
        .scheduler
        .run(Job::ProcessInstallments, first.due_date)
        .await
        .unwrap();

    assert_eq!((report.total, report.processed, report.skipped), (1, 0, 1));
    assert_eq!(app.gateway.invoice_count(), 0);
    assert_eq!(
        app.store.installment(&first.id).status,
        InstallmentStatus::Pending
    );
}

#[tokio::test]
async fn test_reminder_sent_once() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, true).await;
    let first = first_installments(&app).remove(0);
    let today = day_before(first.due_date, 2);

    let report = app
        .services
        .scheduler
        .run(Job::SendReminders, today)
        .await
        .unwrap();
    assert_eq!((report.total, report.processed), (1, 1));
    assert!(app.store.installment(&first.id).reminder_sent);

    let report = app
        .services
        .scheduler
        .run(Job::SendReminders, today)
        .await
        .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(app.notifier.count(NotificationKind::PaymentReminder), 1);
}

#[tokio::test]
async fn test_reminder_outside_window_not_sent() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, true).await;
    let first = first_installments(&app).remove(0);

    let window = u64::from(app.config.scheduler.reminder_days);
    let report = app
        .services
        .scheduler
        .run(Job::SendReminders, day_before(first.due_date, window + 1))
        .await
        .unwrap();

    assert_eq!(report.total, 0);
    assert_eq!(app.notifier.count(NotificationKind::PaymentReminder), 0);
}

#[tokio::test]
async fn test_failed_reminder_is_retried() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, true).await;
    let first = first_installments(&app).remove(0);
    let today = day_before(first.due_date, 1);

    app.notifier.fail_for(CUSTOMER_EMAIL);
    let report = app
        .services
        .scheduler
        .run(Job::SendReminders, today)
        .await
        .unwrap();
    assert_eq!(report.errors, 1);
    assert!(!app.store.installment(&first.id).reminder_sent);

    app.notifier.failing_recipients.lock().unwrap().clear();
    let report = app
        .services
        .scheduler
        .run(Job::SendReminders, today)
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert!(app.store.installment(&first.id).reminder_sent);
}

#[tokio::test]
async fn test_overdue_notice_leaves_status_alone() {
    let app = TestApp::new().with_installment_order();
    checkout(&app, 1001, true).await;
    let first = first_installments(&app).remove(0);

    let report = app
        .services
        .scheduler
        .run(Job::OverdueNotifications, day_after(first.due_date, 5))
        .await
        .unwrap();

    assert_eq!((report.total, report.processed), (1, 1));
    assert_eq!(app.notifier.count(NotificationKind::OverdueNotice), 1);
    assert_eq!(
        app.store.installment(&first.id).status,
        InstallmentStatus::Pending
    );
}

#[tokio::test]
async fn test_monthly_report_goes_to_admin() {
    let app = TestApp::new();
    let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();

    let report = app
        .services
        .scheduler
        .run(Job::MonthlyReport, today)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    let sent = app.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::MonthlyReport);
    assert_eq!(sent[0].recipient, app.config.app.admin_email);
}

#[tokio::test]
async fn test_runner_runs_each_job_on_its_cadence() {
    let app = TestApp::new();
    let runner = JobRunner::new(app.services.scheduler.clone(), Duration::from_secs(3600));
    let runner = Arc::new(runner);

    let mid_month = NaiveDate::from_ymd_opt(2030, 3, 10).unwrap();
    let jobs: Vec<Job> = runner
        .on_scheduled_tick(mid_month)
        .await
        .into_iter()
        .map(|r| r.job)
        .collect();
    assert_eq!(
        jobs,
        vec![
            Job::ProcessInstallments,
            Job::SendReminders,
            Job::OverdueNotifications
        ]
    );

    // Same day: nothing left to run
    assert!(runner.on_scheduled_tick(mid_month).await.is_empty());

    // First of the next month: daily, weekly and monthly jobs all due
    let first_of_month = NaiveDate::from_ymd_opt(2030, 4, 1).unwrap();
    assert_eq!(runner.on_scheduled_tick(first_of_month).await.len(), 4);
}
