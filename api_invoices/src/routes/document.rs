use std::sync::Arc;

use actix_web::{Responder, get, web};
use chrono::Utc;
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    jwt::JwtClaims,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{misc::document::render_document, services};

/// Printable HTML invoice.
#[get("/{id}/document")]
pub async fn get_document(
    claims: web::ReqData<JwtClaims>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let invoice = services::invoice::get_owned_invoice(pg_pool, claims.user_id, path.into_inner()).await?;
    let client = db::client::get_client_for_user(pg_pool, claims.user_id, invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    let sender = db::user::get_user_by_id(pg_pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let html = render_document(
        &invoice,
        &client,
        &sender,
        &config.currency.default_currency,
        Utc::now().naive_utc(),
    )?;
    Success::html(html)
}
