use serde::Serialize;

use crate::modules::installments::models::{Installment, InstallmentPlan};
use crate::modules::orders::models::Order;
use crate::modules::reports::models::MonthlyReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvoiceIssued,
    PaymentReminder,
    OverdueNotice,
    InstallmentPaid,
    PlanCompleted,
    MonthlyReport,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvoiceIssued => "invoice_issued",
            Self::PaymentReminder => "payment_reminder",
            Self::OverdueNotice => "overdue_notice",
            Self::InstallmentPaid => "installment_paid",
            Self::PlanCompleted => "plan_completed",
            Self::MonthlyReport => "monthly_report",
        }
    }
}

/// A rendered e-mail ready for the transport
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Order the message is about; None for admin reports
    pub order_id: Option<u64>,
    pub installment_id: Option<String>,
}

/// Order, plan and installment a customer message talks about
pub struct InstallmentContext<'a> {
    pub order: &'a Order,
    pub plan: &'a InstallmentPlan,
    pub installment: &'a Installment,
}

impl InstallmentContext<'_> {
    /// Line item name for the plan's product, falling back to the id
    pub fn product_name(&self) -> String {
        self.order
            .items
            .iter()
            .find(|item| {
                item.product_id == self.plan.product_id
                    && item.variation_id == self.plan.variation_id
            })
            .map(|item| item.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Product #{}", self.plan.product_id))
    }

    fn amount(&self) -> String {
        self.plan.currency.format_amount(self.installment.amount)
    }

    fn due_date(&self) -> String {
        self.installment.due_date.format("%B %-d, %Y").to_string()
    }

    fn position(&self) -> String {
        format!(
            "{} of {}",
            self.installment.installment_number, self.plan.installment_count
        )
    }

    fn notification(&self, kind: NotificationKind, subject: String, body: String) -> Notification {
        Notification {
            kind,
            recipient: self.order.billing.email.clone(),
            subject,
            body,
            order_id: Some(self.order.id),
            installment_id: Some(self.installment.id.clone()),
        }
    }
}

impl Notification {
    pub fn invoice_issued(ctx: &InstallmentContext<'_>, invoice_url: &str) -> Self {
        let body = format!(
            "Dear {},\n\nYour installment payment is now due.\n\nOrder: #{}\nProduct: {}\n\
             Installment: {}\nAmount: {}\nDue Date: {}\n\n\
             Please use the link below to make your payment:\n{}\n\nThank you!",
            ctx.order.billing.first_name,
            ctx.order.id,
            ctx.product_name(),
            ctx.position(),
            ctx.amount(),
            ctx.due_date(),
            invoice_url
        );
        ctx.notification(
            NotificationKind::InvoiceIssued,
            format!("Payment Due - Installment for Order #{}", ctx.order.id),
            body,
        )
    }

    pub fn payment_reminder(ctx: &InstallmentContext<'_>) -> Self {
        let body = format!(
            "Dear {},\n\nThis is a reminder that your installment payment is due soon.\n\n\
             Order: #{}\nProduct: {}\nInstallment: {}\nAmount: {}\nDue Date: {}\n\nThank you!",
            ctx.order.billing.first_name,
            ctx.order.id,
            ctx.product_name(),
            ctx.position(),
            ctx.amount(),
            ctx.due_date()
        );
        ctx.notification(
            NotificationKind::PaymentReminder,
            format!(
                "Payment Reminder - Installment Due for Order #{}",
                ctx.order.id
            ),
            body,
        )
    }

    pub fn overdue_notice(ctx: &InstallmentContext<'_>, days_overdue: i64) -> Self {
        let body = format!(
            "Dear {},\n\nYour installment payment is now {} days overdue.\n\n\
             Order: #{}\nProduct: {}\nInstallment: {}\nAmount: {}\nOriginal Due Date: {}\n\n\
             Please make your payment immediately.\n\n\
             If you have already made this payment, please disregard this notice.\n\nThank you!",
            ctx.order.billing.first_name,
            days_overdue,
            ctx.order.id,
            ctx.product_name(),
            ctx.position(),
            ctx.amount(),
            ctx.due_date()
        );
        ctx.notification(
            NotificationKind::OverdueNotice,
            format!("OVERDUE: Payment Required for Order #{}", ctx.order.id),
            body,
        )
    }

    pub fn installment_paid(ctx: &InstallmentContext<'_>) -> Self {
        let body = format!(
            "Dear {},\n\nWe received your payment of {} for installment {} of order #{}.\n\nThank you!",
            ctx.order.billing.first_name,
            ctx.amount(),
            ctx.position(),
            ctx.order.id
        );
        ctx.notification(
            NotificationKind::InstallmentPaid,
            format!("Installment Payment Received - Order #{}", ctx.order.id),
            body,
        )
    }

    pub fn plan_completed(order: &Order, plan: &InstallmentPlan) -> Self {
        let body = format!(
            "Dear {},\n\nAll {} installments for order #{} have been paid ({} in total).\n\nThank you!",
            order.billing.first_name,
            plan.installment_count,
            order.id,
            plan.currency.format_amount(plan.total_amount)
        );
        Notification {
            kind: NotificationKind::PlanCompleted,
            recipient: order.billing.email.clone(),
            subject: format!("Installment Plan Completed - Order #{}", order.id),
            body,
            order_id: Some(order.id),
            installment_id: None,
        }
    }

    pub fn monthly_report(admin_email: &str, report: &MonthlyReport) -> Self {
        let body = format!(
            "Monthly Installment Report for {}\n\nTotal New Plans: {}\nCompleted Plans: {}\n\
             Total Revenue: {}\nOutstanding Overdue: {}\nActive Plans: {}\n\n\
             This is an automated report.",
            report.period,
            report.total_plans,
            report.completed_plans,
            report.total_revenue,
            report.overdue_amount,
            report.active_plans
        );
        Notification {
            kind: NotificationKind::MonthlyReport,
            recipient: admin_email.to_string(),
            subject: format!("Installment Monthly Report - {}", report.period),
            body,
            order_id: None,
            installment_id: None,
        }
    }
}
