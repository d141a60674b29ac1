use crate::admin;
use crate::auth;
use crate::config::Config;
use crate::db::{self, Pool};
use crate::models::BuildId;
use crate::registry::JobTypeRegistry;
use crate::web;
use actix_web::{get, post, HttpRequest, HttpResponse, Responder};
use buildfarm_common::api::{BuildInfo, BuildRequest, UploadResult};
use chrono::Utc;

#[get("/{id}")]
pub async fn get_build(pool: web::Data<Pool>, id: web::Path<i32>) -> web::Result<impl Responder> {
    let store = db::lock(&pool)?;
    if let Ok(build) = store.build(BuildId(id.into_inner())) {
        Ok(HttpResponse::Ok().json(BuildInfo::from(build)))
    } else {
        Ok(HttpResponse::NotFound().finish())
    }
}

#[post("")]
pub async fn request_build(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    registry: web::Data<JobTypeRegistry>,
    request: web::Json<BuildRequest>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    let queued = admin::queue_build(&mut store, &registry, &request, Utc::now())
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::Ok().json(queued))
}

#[post("/{id}/cancel")]
pub async fn cancel_build(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    registry: web::Data<JobTypeRegistry>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    let state = admin::cancel_build(&mut store, &registry, BuildId(id.into_inner()), Utc::now())
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::Ok().json(state))
}

#[post("/{id}/retry")]
pub async fn retry_build(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    registry: web::Data<JobTypeRegistry>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    let queued = admin::retry_build(&mut store, &registry, BuildId(id.into_inner()), Utc::now())
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::Ok().json(queued))
}

#[post("/{id}/supersede")]
pub async fn supersede_build(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::supersede_build(&mut store, BuildId(id.into_inner()), Utc::now())
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/upload")]
pub async fn complete_upload(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    result: web::Json<UploadResult>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::complete_upload(
        &mut store,
        BuildId(id.into_inner()),
        result.success,
        Utc::now(),
    )
    .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}
