// MySQL repositories against a real database.
//
// Each test creates its own database from TEST_DATABASE_URL and returns early
// when the variable is unset.

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use helpers::TestDatabase;
use splitpay::core::Currency;
use splitpay::modules::installments::models::{
    Installment, InstallmentPlan, InstallmentStatus, PlanSchedule, PlanStatus,
};
use splitpay::modules::installments::repositories::{
    InstallmentRepository, MySqlInstallmentRepository, MySqlPlanRepository, PlanRepository,
};
use splitpay::modules::payments::models::{Payment, PaymentType};
use splitpay::modules::payments::repositories::{MySqlPaymentRepository, PaymentRepository};
use splitpay::modules::reports::repositories::{MySqlReportRepository, ReportRepository};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
}

/// Plan for `order_id` with one installment per due date
fn schedule(
    order_id: u64,
    status: PlanStatus,
    amount: Decimal,
    due_dates: &[NaiveDate],
) -> PlanSchedule {
    let count = due_dates.len() as u32;
    let plan = InstallmentPlan::new(
        order_id,
        7,
        11,
        None,
        dec!(100) + amount * Decimal::from(count),
        dec!(100),
        count,
        Currency::KWD,
        status,
    )
    .unwrap();
    let installments = due_dates
        .iter()
        .enumerate()
        .map(|(i, due)| Installment::new(plan.id.clone(), i as u32 + 1, amount, *due).unwrap())
        .collect();
    PlanSchedule { plan, installments }
}

fn payment(
    order_id: u64,
    installment_id: Option<&str>,
    charge_id: &str,
    amount: Decimal,
    currency: Currency,
    status: &str,
    created_at: DateTime<Utc>,
) -> Payment {
    let payment_type = if installment_id.is_some() {
        PaymentType::Installment
    } else {
        PaymentType::Initial
    };
    let mut payment = Payment::new(
        order_id,
        installment_id.map(str::to_string),
        charge_id.to_string(),
        amount,
        currency,
        status,
        payment_type,
        json!({"id": charge_id}),
    );
    payment.created_at = created_at;
    payment.updated_at = created_at;
    payment
}

#[tokio::test]
async fn test_paid_transition_stamps_paid_at_once() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    let plans = MySqlPlanRepository::new(db.pool.clone());
    let installments = MySqlInstallmentRepository::new(db.pool.clone());

    let created = schedule(
        1001,
        PlanStatus::Pending,
        dec!(10),
        &[date(2026, 4, 1), date(2026, 5, 1), date(2026, 6, 1)],
    );
    plans.create_schedules(&[created.clone()]).await.unwrap();
    let first = &created.installments[0];
    let second = &created.installments[1];

    assert!(plans
        .transition_status(&created.plan.id, &[PlanStatus::Pending], PlanStatus::Active)
        .await
        .unwrap());
    assert!(!plans
        .transition_status(&created.plan.id, &[PlanStatus::Pending], PlanStatus::Active)
        .await
        .unwrap());

    assert!(installments
        .mark_invoiced(&first.id, "inv_1", Some("https://pay.example/inv_1"))
        .await
        .unwrap());
    assert!(!installments
        .mark_invoiced(&first.id, "inv_other", None)
        .await
        .unwrap());

    let paid_at = at(2026, 4, 2);
    assert!(installments
        .transition_status(&first.id, &InstallmentStatus::OPEN, InstallmentStatus::Paid, paid_at)
        .await
        .unwrap());
    assert!(!installments
        .transition_status(
            &first.id,
            &InstallmentStatus::OPEN,
            InstallmentStatus::Paid,
            at(2026, 4, 9)
        )
        .await
        .unwrap());

    let stored = installments.find_by_invoice_id("inv_1").await.unwrap().unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.status, InstallmentStatus::Paid);
    assert_eq!(stored.paid_at, Some(paid_at));
    assert_eq!(stored.invoice_url.as_deref(), Some("https://pay.example/inv_1"));

    // Moving anywhere but paid leaves paid_at alone
    assert!(installments
        .transition_status(
            &second.id,
            &InstallmentStatus::OPEN,
            InstallmentStatus::Failed,
            at(2026, 5, 2)
        )
        .await
        .unwrap());
    let failed = installments.find_by_id(&second.id).await.unwrap().unwrap();
    assert_eq!(failed.status, InstallmentStatus::Failed);
    assert_eq!(failed.paid_at, None);

    assert_eq!(installments.count_unpaid(&created.plan.id).await.unwrap(), 2);

    assert!(plans
        .transition_status(&created.plan.id, &[PlanStatus::Active], PlanStatus::Completed)
        .await
        .unwrap());
    let completed = plans.find_by_id(&created.plan.id).await.unwrap().unwrap();
    assert_eq!(completed.status, PlanStatus::Completed);
    assert!(completed.completed_at.is_some());

    db.teardown().await;
}

#[tokio::test]
async fn test_terminal_payment_refuses_updates() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    let payments = MySqlPaymentRepository::new(db.pool.clone());

    let initial = payment(
        1001,
        None,
        "chg_1",
        dec!(100),
        Currency::KWD,
        "INITIATED",
        at(2026, 3, 1),
    );
    payments.create(&initial).await.unwrap();

    assert!(payments
        .update_status(&initial.id, "in_progress", &json!({"status": "IN_PROGRESS"}))
        .await
        .unwrap());
    assert!(payments
        .update_status(&initial.id, "CAPTURED", &json!({"status": "CAPTURED"}))
        .await
        .unwrap());
    assert!(!payments
        .update_status(&initial.id, "FAILED", &json!({"status": "FAILED"}))
        .await
        .unwrap());
    assert!(!payments
        .update_status(&initial.id, "CAPTURED", &json!({"status": "CAPTURED", "again": true}))
        .await
        .unwrap());

    let stored = payments.find_by_charge_id("chg_1").await.unwrap().unwrap();
    assert_eq!(stored.status, "CAPTURED");
    assert_eq!(stored.response_data["status"], "CAPTURED");
    assert!(stored.response_data.get("again").is_none());
    assert_eq!(stored.payment_type, PaymentType::Initial);
    assert_eq!(payments.find_by_order(1001).await.unwrap().len(), 1);

    db.teardown().await;
}

#[tokio::test]
async fn test_reminder_window_is_inclusive_and_flagged_once() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    let plans = MySqlPlanRepository::new(db.pool.clone());
    let installments = MySqlInstallmentRepository::new(db.pool.clone());
    let today = date(2026, 4, 10);

    let created = schedule(
        1001,
        PlanStatus::Active,
        dec!(10),
        &[
            date(2026, 4, 9),
            date(2026, 4, 10),
            date(2026, 4, 13),
            date(2026, 4, 14),
        ],
    );
    plans.create_schedules(&[created.clone()]).await.unwrap();
    let ids: Vec<&str> = created.installments.iter().map(|i| i.id.as_str()).collect();

    let window = installments
        .find_for_reminder(today, date(2026, 4, 13))
        .await
        .unwrap();
    let window: Vec<&str> = window.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(window, vec![ids[1], ids[2]]);

    assert!(installments.mark_reminder_sent(ids[2], at(2026, 4, 10)).await.unwrap());
    assert!(!installments.mark_reminder_sent(ids[2], at(2026, 4, 11)).await.unwrap());

    let window = installments
        .find_for_reminder(today, date(2026, 4, 13))
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, ids[1]);

    let reminded = installments.find_by_id(ids[2]).await.unwrap().unwrap();
    assert!(reminded.reminder_sent);
    assert_eq!(reminded.reminder_sent_at, Some(at(2026, 4, 10)));

    let due: Vec<String> = installments
        .find_due(today)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(due, vec![ids[0].to_string(), ids[1].to_string()]);

    let overdue = installments.find_overdue(today).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, ids[0]);

    db.teardown().await;
}

#[tokio::test]
async fn test_deleting_plan_cascades_to_installments() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    let plans = MySqlPlanRepository::new(db.pool.clone());
    let installments = MySqlInstallmentRepository::new(db.pool.clone());
    let payments = MySqlPaymentRepository::new(db.pool.clone());

    let created = schedule(
        1001,
        PlanStatus::Pending,
        dec!(10),
        &[date(2026, 4, 1), date(2026, 5, 1)],
    );
    let kept = schedule(1002, PlanStatus::Pending, dec!(10), &[date(2026, 4, 1), date(2026, 5, 1)]);
    plans
        .create_schedules(&[created.clone(), kept.clone()])
        .await
        .unwrap();
    let installment_id = created.installments[0].id.clone();
    payments
        .create(&payment(
            1001,
            Some(&installment_id),
            "chg_inst",
            dec!(10),
            Currency::KWD,
            "CAPTURED",
            at(2026, 4, 1),
        ))
        .await
        .unwrap();

    plans.delete(&created.plan.id).await.unwrap();

    assert!(plans.find_by_id(&created.plan.id).await.unwrap().is_none());
    assert!(installments.find_by_plan(&created.plan.id).await.unwrap().is_empty());
    assert!(installments.find_by_id(&installment_id).await.unwrap().is_none());
    assert_eq!(installments.find_by_plan(&kept.plan.id).await.unwrap().len(), 2);

    // The audit row survives without its installment
    let audit = payments.find_by_charge_id("chg_inst").await.unwrap().unwrap();
    assert_eq!(audit.installment_id, None);

    db.teardown().await;
}

#[tokio::test]
async fn test_plan_unique_per_order_line() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    let plans = MySqlPlanRepository::new(db.pool.clone());

    let first = schedule(1001, PlanStatus::Pending, dec!(10), &[date(2026, 4, 1), date(2026, 5, 1)]);
    let duplicate = schedule(1001, PlanStatus::Pending, dec!(10), &[date(2026, 4, 1), date(2026, 5, 1)]);
    plans.create_schedules(&[first.clone()]).await.unwrap();

    assert!(plans.create_schedules(&[duplicate.clone()]).await.is_err());
    assert!(plans.find_by_id(&duplicate.plan.id).await.unwrap().is_none());
    assert_eq!(plans.find_by_order(1001).await.unwrap().len(), 1);
    assert_eq!(plans.find_by_customer(7).await.unwrap().len(), 1);

    db.teardown().await;
}

#[tokio::test]
async fn test_report_aggregates() {
    let Some(db) = TestDatabase::new().await else {
        return;
    };
    let plans = MySqlPlanRepository::new(db.pool.clone());
    let payments = MySqlPaymentRepository::new(db.pool.clone());
    let reports = MySqlReportRepository::new(db.pool.clone());

    // Created in March, first installment paid
    let mut march = schedule(
        1001,
        PlanStatus::Active,
        dec!(10),
        &[date(2026, 3, 20), date(2026, 4, 20), date(2026, 5, 20)],
    );
    march.plan.created_at = at(2026, 3, 10);
    march.installments[0].status = InstallmentStatus::Paid;
    march.installments[0].paid_at = Some(at(2026, 3, 20));

    // Created in January, completed in March
    let mut finished = schedule(
        1002,
        PlanStatus::Completed,
        dec!(15),
        &[date(2026, 2, 5), date(2026, 3, 5)],
    );
    finished.plan.created_at = at(2026, 1, 5);
    finished.plan.completed_at = Some(at(2026, 3, 15));
    for installment in &mut finished.installments {
        installment.status = InstallmentStatus::Paid;
    }

    // Created in February, both installments past due by April 5th
    let mut late = schedule(
        1003,
        PlanStatus::Active,
        dec!(20),
        &[date(2026, 3, 1), date(2026, 4, 1)],
    );
    late.plan.created_at = at(2026, 2, 10);

    plans
        .create_schedules(&[march.clone(), finished.clone(), late.clone()])
        .await
        .unwrap();

    let rows = [
        payment(1001, None, "chg_a", dec!(100), Currency::KWD, "CAPTURED", at(2026, 3, 10)),
        payment(
            1001,
            Some(&march.installments[0].id),
            "chg_a1",
            dec!(10),
            Currency::KWD,
            "CAPTURED",
            at(2026, 3, 20),
        ),
        payment(
            1001,
            Some(&march.installments[1].id),
            "chg_a2",
            dec!(10),
            Currency::KWD,
            "FAILED",
            at(2026, 3, 21),
        ),
        payment(
            1002,
            Some(&finished.installments[0].id),
            "chg_b1",
            dec!(15),
            Currency::KWD,
            "CAPTURED",
            at(2026, 2, 15),
        ),
        payment(1003, None, "chg_c", dec!(30), Currency::SAR, "CAPTURED", at(2026, 3, 5)),
    ];
    for row in &rows {
        payments.create(row).await.unwrap();
    }

    let figures = reports
        .monthly_figures(date(2026, 3, 1), date(2026, 3, 31), date(2026, 4, 5))
        .await
        .unwrap();
    assert_eq!(figures.total_plans, 1);
    assert_eq!(figures.completed_plans, 1);
    assert_eq!(figures.active_plans, 2);
    assert_eq!(figures.total_revenue, dec!(140));
    assert_eq!(figures.overdue_amount, dec!(40));

    let all = reports.payment_stats(None, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let kwd = &all[0];
    assert_eq!(kwd.currency, "KWD");
    assert_eq!(kwd.total_payments, 3);
    assert_eq!(kwd.total_amount, dec!(125));
    assert_eq!(kwd.initial_payments, 1);
    assert_eq!(kwd.installment_payments, 2);
    assert_eq!(kwd.plans, 2);
    let sar = &all[1];
    assert_eq!(sar.currency, "SAR");
    assert_eq!(sar.total_payments, 1);
    assert_eq!(sar.plans, 0);

    let march_only = reports
        .payment_stats(Some(date(2026, 3, 1)), Some(date(2026, 3, 31)))
        .await
        .unwrap();
    assert_eq!(march_only[0].currency, "KWD");
    assert_eq!(march_only[0].total_payments, 2);
    assert_eq!(march_only[0].total_amount, dec!(110));
    assert_eq!(march_only[0].plans, 1);

    db.teardown().await;
}
