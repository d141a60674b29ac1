use crate::admin;
use crate::auth;
use crate::config::Config;
use crate::db::{self, Pool};
use crate::models::BuilderId;
use crate::web;
use actix_web::{get, post, HttpRequest, HttpResponse, Responder};
use buildfarm_common::api::{BuilderInfo, DisableBuilderRequest};
use chrono::Utc;

#[get("")]
pub async fn list_builders(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let store = db::lock(&pool)?;
    let builders = store.builders().map(BuilderInfo::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(builders))
}

#[get("/{id}")]
pub async fn get_builder(pool: web::Data<Pool>, id: web::Path<i32>) -> web::Result<impl Responder> {
    let store = db::lock(&pool)?;
    if let Ok(builder) = store.builder(BuilderId(id.into_inner())) {
        Ok(HttpResponse::Ok().json(BuilderInfo::from(builder)))
    } else {
        Ok(HttpResponse::NotFound().finish())
    }
}

#[post("/{id}/reset")]
pub async fn reset_builder(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::reset_builder(&mut store, BuilderId(id.into_inner()), Utc::now())
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/enable")]
pub async fn enable_builder(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::enable_builder(&mut store, BuilderId(id.into_inner()), Utc::now())
        .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/disable")]
pub async fn disable_builder(
    req: HttpRequest,
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<DisableBuilderRequest>,
) -> web::Result<impl Responder> {
    if auth::admin(&cfg, &req).is_err() {
        return Ok(HttpResponse::Forbidden().finish());
    }

    let mut store = db::lock(&pool)?;
    admin::disable_builder(
        &mut store,
        BuilderId(id.into_inner()),
        request.into_inner().reason,
    )
    .map_err(web::Error::rejected)?;
    Ok(HttpResponse::NoContent().finish())
}
