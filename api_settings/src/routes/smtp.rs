use std::sync::Arc;

use actix_web::{Responder, delete, get, put, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use serde_json::json;
use sqlx::PgPool;

use crate::{dtos::smtp::SaveSmtpRequest, services};

/// Creates or replaces the caller's SMTP settings.
#[put("/smtp")]
pub async fn put_smtp(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    req: web::Json<SaveSmtpRequest>,
) -> Res<impl Responder> {
    let settings = services::smtp::save_smtp(&pool, claims.user_id, req.into_inner()).await?;
    Success::ok(settings)
}

/// The caller's SMTP settings, or `null` when none are stored.
#[get("/smtp")]
pub async fn get_smtp(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let settings = services::smtp::get_smtp(&pool, claims.user_id).await?;
    Success::ok(settings)
}

#[delete("/smtp")]
pub async fn delete_smtp(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let deleted = services::smtp::delete_smtp(&pool, claims.user_id).await?;
    Success::ok(json!({ "deleted": deleted }))
}
