use std::sync::Arc;

use actix_web::{Responder, post, web};
use chrono::Utc;
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims};
use mailer::InvoiceMailer;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::invoice::{InvoiceView, ScheduleRequest},
    services,
};

/// Emails the invoice now. Failures surface as errors and leave the invoice unchanged.
#[post("/{id}/send")]
pub async fn post_send(
    claims: web::ReqData<JwtClaims>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    mailer: web::Data<Arc<dyn InvoiceMailer>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let invoice = services::email::send_invoice_email(
        &pool,
        mailer.get_ref().as_ref(),
        &config,
        claims.user_id,
        path.into_inner(),
    )
    .await?;
    Success::ok(InvoiceView::new(&invoice, Utc::now().naive_utc()))
}

#[post("/{id}/schedule")]
pub async fn post_schedule(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    path: web::Path<Uuid>,
    req: web::Json<ScheduleRequest>,
) -> Res<impl Responder> {
    let invoice = services::email::schedule_invoice_email(
        &pool,
        claims.user_id,
        path.into_inner(),
        req.scheduled_at.naive_utc(),
    )
    .await?;
    Success::ok(InvoiceView::new(&invoice, Utc::now().naive_utc()))
}
