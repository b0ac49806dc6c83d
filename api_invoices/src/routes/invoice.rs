use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims, misc::EmailSendOption};
use currency::RateCache;
use mailer::InvoiceMailer;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::invoice::{CreateInvoiceRequest, CreateInvoiceResponse, InvoiceListQuery, InvoiceView, StatsQuery},
    services,
};

/// Creates an invoice for one of the caller's clients.
///
/// # Output
/// - Success: 201 with `{ invoice, email? }`; `email` reports the outcome of `send_now`
/// - Error: 400 for invalid input, 403 when the plan limit is reached, 404 for a foreign client
#[post("")]
pub async fn post_invoice(
    claims: web::ReqData<JwtClaims>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    mailer: web::Data<Arc<dyn InvoiceMailer>>,
    req: web::Json<CreateInvoiceRequest>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let req = req.into_inner();
    let invoice = services::invoice::create_invoice(pg_pool, claims.user_id, &req).await?;

    let (invoice, email) = if req.email_send_option == EmailSendOption::SendNow {
        let (invoice, outcome) =
            services::email::send_after_create(pg_pool, mailer.get_ref().as_ref(), &config, invoice)
                .await;
        (invoice, Some(outcome))
    } else {
        (invoice, None)
    };

    Success::created(CreateInvoiceResponse {
        invoice: InvoiceView::new(&invoice, chrono::Utc::now().naive_utc()),
        email,
    })
}

/// Lists the caller's invoices, newest first, optionally by derived status or client.
#[get("")]
pub async fn get_invoices(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    query: web::Query<InvoiceListQuery>,
) -> Res<impl Responder> {
    let invoices = services::invoice::list_invoices(&pool, claims.user_id, &query).await?;
    Success::ok(invoices)
}

/// Dashboard numbers, converted to `?currency=` when given.
#[get("/stats")]
pub async fn get_stats(
    claims: web::ReqData<JwtClaims>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    rates: web::Data<Arc<RateCache>>,
    query: web::Query<StatsQuery>,
) -> Res<impl Responder> {
    let stats = services::stats::get_stats(
        &pool,
        &rates,
        &config,
        claims.user_id,
        query.currency.as_deref(),
    )
    .await?;
    Success::ok(stats)
}

#[get("/{id}")]
pub async fn get_invoice(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let detail = services::invoice::get_invoice_detail(&pool, claims.user_id, path.into_inner()).await?;
    Success::ok(detail)
}

#[post("/{id}/paid")]
pub async fn post_mark_paid(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let invoice = services::invoice::mark_paid(&pool, claims.user_id, path.into_inner()).await?;
    Success::ok(invoice)
}
