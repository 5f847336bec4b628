use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use splitpay::core::{AppError, Result};
use splitpay::modules::installments::models::{
    Installment, InstallmentPlan, InstallmentStatus, PlanSchedule, PlanStatus,
};
use splitpay::modules::installments::repositories::{InstallmentRepository, PlanRepository};
use splitpay::modules::payments::models::{ChargeStatus, Payment};
use splitpay::modules::payments::repositories::PaymentRepository;
use splitpay::modules::reports::models::{MonthlyFigures, PaymentStats};
use splitpay::modules::reports::repositories::ReportRepository;

/// Plans, installments and payments held in memory with the same
/// conditional-update semantics as the MySQL repositories
#[derive(Default)]
pub struct MemoryStore {
    plans: Mutex<Vec<InstallmentPlan>>,
    installments: Mutex<Vec<Installment>>,
    payments: Mutex<Vec<Payment>>,
}

impl MemoryStore {
    pub fn plans(&self) -> Vec<InstallmentPlan> {
        self.plans.lock().unwrap().clone()
    }

    /// Ordered by plan, then installment number
    pub fn installments(&self) -> Vec<Installment> {
        let mut all = self.installments.lock().unwrap().clone();
        all.sort_by(|a, b| {
            a.plan_id
                .cmp(&b.plan_id)
                .then(a.installment_number.cmp(&b.installment_number))
        });
        all
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }

    pub fn installment(&self, id: &str) -> Installment {
        self.installments
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .expect("installment exists")
    }

    pub fn plan(&self, id: &str) -> InstallmentPlan {
        self.plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("plan exists")
    }

    /// Persist schedules directly, bypassing checkout
    pub fn seed(&self, schedules: &[PlanSchedule]) {
        for schedule in schedules {
            self.plans.lock().unwrap().push(schedule.plan.clone());
            self.installments
                .lock()
                .unwrap()
                .extend(schedule.installments.iter().cloned());
        }
    }

    pub fn seed_payment(&self, payment: Payment) {
        self.payments.lock().unwrap().push(payment);
    }

    /// Overwrite an installment, e.g. to attach an invoice id in a test
    pub fn put_installment(&self, installment: Installment) {
        let mut all = self.installments.lock().unwrap();
        all.retain(|i| i.id != installment.id);
        all.push(installment);
    }
}

#[async_trait]
impl PlanRepository for MemoryStore {
    async fn create_schedules(&self, schedules: &[PlanSchedule]) -> Result<()> {
        self.seed(schedules);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<InstallmentPlan>> {
        Ok(self.plans.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<InstallmentPlan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_by_customer(&self, customer_id: u64) -> Result<Vec<InstallmentPlan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[PlanStatus],
        to: PlanStatus,
    ) -> Result<bool> {
        let mut plans = self.plans.lock().unwrap();
        let Some(plan) = plans.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if !from.contains(&plan.status) {
            return Ok(false);
        }
        plan.status = to;
        plan.updated_at = Utc::now();
        if to == PlanStatus::Completed {
            plan.completed_at = Some(plan.updated_at);
        }
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.plans.lock().unwrap().retain(|p| p.id != id);
        self.installments.lock().unwrap().retain(|i| i.plan_id != id);
        Ok(())
    }
}

#[async_trait]
impl InstallmentRepository for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Installment>> {
        Ok(self
            .installments
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn find_by_plan(&self, plan_id: &str) -> Result<Vec<Installment>> {
        let mut found: Vec<_> = self
            .installments
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.plan_id == plan_id)
            .cloned()
            .collect();
        found.sort_by_key(|i| i.installment_number);
        Ok(found)
    }

    async fn find_by_invoice_id(&self, tap_invoice_id: &str) -> Result<Option<Installment>> {
        Ok(self
            .installments
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.tap_invoice_id.as_deref() == Some(tap_invoice_id))
            .cloned())
    }

    async fn find_due(&self, date: NaiveDate) -> Result<Vec<Installment>> {
        Ok(self.select(|i| i.status == InstallmentStatus::Pending && i.due_date <= date))
    }

    async fn find_for_reminder(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Installment>> {
        Ok(self.select(|i| {
            i.status == InstallmentStatus::Pending
                && !i.reminder_sent
                && i.due_date >= from
                && i.due_date <= until
        }))
    }

    async fn find_overdue(&self, today: NaiveDate) -> Result<Vec<Installment>> {
        Ok(self.select(|i| i.status == InstallmentStatus::Pending && i.due_date < today))
    }

    async fn mark_invoiced(
        &self,
        id: &str,
        tap_invoice_id: &str,
        invoice_url: Option<&str>,
    ) -> Result<bool> {
        self.update(id, |i| {
            if i.status != InstallmentStatus::Pending {
                return false;
            }
            i.status = InstallmentStatus::Invoiced;
            i.tap_invoice_id = Some(tap_invoice_id.to_string());
            i.invoice_url = invoice_url.map(str::to_string);
            true
        })
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[InstallmentStatus],
        to: InstallmentStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.update(id, |i| {
            if !from.contains(&i.status) {
                return false;
            }
            i.status = to;
            if to == InstallmentStatus::Paid {
                i.paid_at = Some(at);
            }
            true
        })
    }

    async fn mark_reminder_sent(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        self.update(id, |i| {
            if i.reminder_sent {
                return false;
            }
            i.reminder_sent = true;
            i.reminder_sent_at = Some(at);
            true
        })
    }

    async fn count_unpaid(&self, plan_id: &str) -> Result<u64> {
        Ok(self
            .installments
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.plan_id == plan_id && i.status != InstallmentStatus::Paid)
            .count() as u64)
    }
}

impl MemoryStore {
    fn select(&self, predicate: impl Fn(&Installment) -> bool) -> Vec<Installment> {
        let mut found: Vec<_> = self
            .installments
            .lock()
            .unwrap()
            .iter()
            .filter(|i| predicate(i))
            .cloned()
            .collect();
        found.sort_by_key(|i| (i.due_date, i.installment_number));
        found
    }

    fn update(&self, id: &str, change: impl FnOnce(&mut Installment) -> bool) -> Result<bool> {
        let mut all = self.installments.lock().unwrap();
        let Some(installment) = all.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        let changed = change(installment);
        if changed {
            installment.updated_at = Utc::now();
        }
        Ok(changed)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create(&self, payment: &Payment) -> Result<()> {
        self.payments.lock().unwrap().push(payment.clone());
        Ok(())
    }

    async fn find_by_charge_id(&self, tap_charge_id: &str) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.tap_charge_id == tap_charge_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_by_order(&self, order_id: u64) -> Result<Vec<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: &str, status: &str, response_data: &Value) -> Result<bool> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", id)))?;

        if ChargeStatus::is_terminal(&payment.status) {
            return Ok(false);
        }
        payment.status = status.to_string();
        payment.response_data = response_data.clone();
        payment.updated_at = Utc::now();
        Ok(true)
    }
}

/// Report figures fixed up front
#[derive(Default)]
pub struct StaticReports {
    pub figures: MonthlyFigures,
    pub stats: Vec<PaymentStats>,
}

#[async_trait]
impl ReportRepository for StaticReports {
    async fn payment_stats(
        &self,
        _from: Option<NaiveDate>,
        _to: Option<NaiveDate>,
    ) -> Result<Vec<PaymentStats>> {
        Ok(self.stats.clone())
    }

    async fn monthly_figures(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
        _today: NaiveDate,
    ) -> Result<MonthlyFigures> {
        Ok(self.figures.clone())
    }
}
