use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::core::{AppError, Result};
use crate::modules::reports::services::report_service::{parse_month, ReportService};

#[derive(Debug, Deserialize)]
pub struct PaymentStatsQuery {
    /// Inclusive, YYYY-MM-DD
    #[serde(default)]
    pub from: Option<String>,
    /// Inclusive, YYYY-MM-DD
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyReportQuery {
    /// YYYY-MM; defaults to the previous month
    #[serde(default)]
    pub month: Option<String>,
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| {
                AppError::validation(format!("Invalid {} '{}'. Expected YYYY-MM-DD", field, v))
            })
        })
        .transpose()
}

/// GET /admin/reports/payments
pub async fn payment_stats(
    service: web::Data<Arc<ReportService>>,
    query: web::Query<PaymentStatsQuery>,
) -> Result<HttpResponse> {
    let from = parse_date("from", query.from.as_deref())?;
    let to = parse_date("to", query.to.as_deref())?;

    let stats = service.payment_stats(from, to).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "currencies": stats })))
}

/// GET /admin/reports/monthly
pub async fn monthly_report(
    service: web::Data<Arc<ReportService>>,
    query: web::Query<MonthlyReportQuery>,
) -> Result<HttpResponse> {
    let today = Utc::now().date_naive();
    let report = match query.month.as_deref() {
        Some(month) => service.monthly_report(parse_month(month)?, today).await?,
        None => service.previous_month_report(today).await?,
    };

    Ok(HttpResponse::Ok().json(report))
}

/// Routes mounted under the authenticated `/admin` scope
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .route("/payments", web::get().to(payment_stats))
            .route("/monthly", web::get().to(monthly_report)),
    );
}
