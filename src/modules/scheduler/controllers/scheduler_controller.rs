use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::core::Result;
use crate::modules::scheduler::models::Job;
use crate::modules::scheduler::services::SchedulerService;

/// Run a job now
/// POST /admin/jobs/{job}/run
pub async fn run_job(
    service: web::Data<Arc<SchedulerService>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let job: Job = path.into_inner().parse()?;
    let report = service.run(job, Utc::now().date_naive()).await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Routes mounted under the authenticated `/admin` scope
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.route("/jobs/{job}/run", web::post().to(run_job));
}
