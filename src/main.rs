use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitpay::config::{Config, DatabaseConfig};
use splitpay::middleware::RequestId;
use splitpay::modules::gateways::services::TapClient;
use splitpay::modules::notifications::services::LogNotifier;
use splitpay::modules::orders::services::WooCommerceStore;
use splitpay::modules::scheduler::JobRunner;
use splitpay::{AppServices, Collaborators, Repositories};

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("splitpay={},actix_web=info", config.app.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config);
    config.validate().context("Configuration validation failed")?;

    tracing::info!(
        env = %config.app.env,
        test_mode = config.tap.test_mode,
        bind = %config.server.bind_address(),
        "Starting splitpay"
    );

    let db_pool = config
        .database
        .create_pool()
        .await
        .context("Failed to create database pool")?;
    DatabaseConfig::run_migrations(&db_pool)
        .await
        .context("Failed to run migrations")?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool initialized"
    );

    let collaborators = Collaborators {
        gateway: Arc::new(TapClient::new(config.tap.clone())?),
        orders: Arc::new(WooCommerceStore::new(config.store.clone())?),
        notifier: Arc::new(LogNotifier),
    };
    let services = AppServices::new(&config, Repositories::mysql(db_pool.clone()), collaborators);
    tracing::warn!(
        admin_email = %config.app.admin_email,
        "Notifications are written to the log only; no mail is delivered"
    );

    if config.scheduler.enabled {
        let runner = Arc::new(JobRunner::new(
            services.scheduler.clone(),
            config.scheduler.tick_interval,
        ));
        tokio::spawn(runner.start());
    } else {
        tracing::warn!("Scheduler disabled; run jobs through /admin/jobs/{{job}}/run");
    }

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .app_data(actix_web::web::Data::new(db_pool.clone()))
            .configure(|cfg| services.configure(cfg))
    })
    .workers(config.server.workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await?;
    Ok(())
}
