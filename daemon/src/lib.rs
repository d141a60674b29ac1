use crate::config::Config;
use crate::interactor::{HttpWorkerChannel, WorkerChannel};
use crate::registry::JobTypeRegistry;
use crate::scheduler::{SchedulePolicy, Scheduler};
use actix_web::dev::Server;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use buildfarm_common::config::BuilderConfig;
use buildfarm_common::errors::*;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod admin;
pub mod api;
pub mod auth;
pub mod cancel;
pub mod config;
pub mod db;
pub mod interactor;
pub mod job_types;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod web;

/// Makes sure every configured builder is known to the store.
pub fn register_builders(pool: &db::Pool, builders: &[BuilderConfig]) -> Result<()> {
    let mut store = db::lock(pool)?;
    let now = Utc::now();
    for builder in builders {
        store.upsert_builder(builder, now);
    }
    Ok(())
}

/// Mounts the admin api.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/builders")
            .service(api::v1::list_builders)
            .service(api::v1::get_builder)
            .service(api::v1::reset_builder)
            .service(api::v1::enable_builder)
            .service(api::v1::disable_builder),
    )
    .service(
        web::scope("/api/v1/queue")
            .service(api::v1::list_queue)
            .service(api::v1::set_score)
            .service(api::v1::suspend_queue_entry)
            .service(api::v1::resume_queue_entry),
    )
    .service(
        web::scope("/api/v1/builds")
            .service(api::v1::request_build)
            .service(api::v1::get_build)
            .service(api::v1::cancel_build)
            .service(api::v1::retry_build)
            .service(api::v1::supersede_build)
            .service(api::v1::complete_upload),
    );
}

pub fn build_server(
    pool: db::Pool,
    config: Config,
    registry: Arc<JobTypeRegistry>,
) -> Result<(Server, SocketAddr)> {
    let bind_addr = config.bind_addr.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::from(registry.clone()))
            .configure(configure)
    })
    .bind(&bind_addr)
    .with_context(|| anyhow!("Failed to bind to {:?}", bind_addr))?;

    let address = server
        .addrs()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Server isn't bound to any address"))?;
    info!("Listening on {}", address);

    Ok((server.run(), address))
}

pub async fn run_config(pool: db::Pool, config: Config) -> Result<()> {
    register_builders(&pool, &config.builders)?;

    let registry = Arc::new(JobTypeRegistry::standard()?);
    let timeout = Duration::from_secs(config.schedule.worker_timeout());
    let channel: Arc<dyn WorkerChannel> = Arc::new(HttpWorkerChannel::new(timeout)?);
    let scheduler = Scheduler::new(
        pool.clone(),
        registry.clone(),
        channel,
        SchedulePolicy::from(&config.schedule),
    )
    .with_state_path(config.schedule.state_path().map(PathBuf::from));

    tokio::spawn(async move {
        if let Err(err) = scheduler.run().await {
            error!("Scheduler stopped: {:#}", err);
        }
    });

    let (server, _) = build_server(pool, config, registry)?;
    server.await?;
    Ok(())
}
