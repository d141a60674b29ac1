use crate::admin;
use crate::auth;
use crate::config::Config;
use crate::db::{self, Pool};
use crate::models::BuildQueueId;
use crate::web;
use actix_web::{get, post, HttpRequest, HttpResponse, Responder};
use buildfarm_common::api::{QueueEntry, ScoreRequest};
use buildfarm_common::errors::*;

/// Sorted the way builders would pick them up.
#[get("")]
pub async fn list_queue(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let store = db::lock(&pool)?;

    let mut records = Vec::new();
    for entry in store.queue_entries() {
        let build = store.build(entry.build_id)?;
        records.push(entry.to_api(build));
    }
    records.sort_by(|a: &QueueEntry, b: &QueueEntry| {
        b.last_score.cmp(&a.last_score).then_with(|| a.id.cmp(&b.id))
    });

    Ok(HttpResponse::Ok().json(records))
}

#[post("/{id}/score")]
pub async fn set_score(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<ScoreRequest>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    let queue_id = BuildQueueId(id.into_inner());
    if !store.contains_queue_entry(queue_id) {
        return Ok(HttpResponse::NotFound().finish());
    }
    admin::manual_score(&mut store, queue_id, request.score)
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/suspend")]
pub async fn suspend_queue_entry(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::suspend(&mut store, BuildQueueId(id.into_inner()))
        .context("Failed to suspend queue entry")
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/resume")]
pub async fn resume_queue_entry(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::resume(&mut store, BuildQueueId(id.into_inner()))
        .context("Failed to resume queue entry")
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}
