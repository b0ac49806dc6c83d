use chrono::{NaiveDateTime, Utc};
use common::{
    env_config::Config,
    error::{AppError, Res},
};
use db::models::invoice::Invoice;
use mailer::{InvoiceEmailData, InvoiceMailer, compose_invoice_email};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{dtos::invoice::EmailOutcome, services::invoice::{ensure_future, get_owned_invoice}};

async fn deliver(
    pool: &PgPool,
    mailer: &dyn InvoiceMailer,
    config: &Config,
    invoice: &Invoice,
) -> Res<()> {
    let client = db::client::get_client_for_user(pool, invoice.user_id, invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    let sender = db::user::get_user_by_id(pool, invoice.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let smtp = db::smtp::get_user_smtp(pool, invoice.user_id).await?;

    let email = compose_invoice_email(
        InvoiceEmailData {
            invoice,
            client_name: &client.name,
            client_email: &client.email,
            sender_name: &sender.name,
            sender_email: &sender.email,
            currency: &config.currency.default_currency,
            base_url: &config.app_base_url,
        },
        smtp,
    )?;
    mailer.send(&email).await
}

/// Emails the invoice to its client now and stamps it as sent.
/// Re-sending an already sent invoice is allowed.
pub async fn send_invoice_email(
    pool: &PgPool,
    mailer: &dyn InvoiceMailer,
    config: &Config,
    user_id: Uuid,
    invoice_id: Uuid,
) -> Res<Invoice> {
    let invoice = get_owned_invoice(pool, user_id, invoice_id).await?;
    deliver(pool, mailer, config, &invoice).await?;

    db::invoice::mark_email_sent(pool, user_id, invoice_id, Utc::now().naive_utc())
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))
}

/// Sends right after creation. The invoice is already committed, so a
/// failure is reported alongside it instead of failing the request.
pub async fn send_after_create(
    pool: &PgPool,
    mailer: &dyn InvoiceMailer,
    config: &Config,
    invoice: Invoice,
) -> (Invoice, EmailOutcome) {
    match send_invoice_email(pool, mailer, config, invoice.user_id, invoice.id).await {
        Ok(sent) => (
            sent,
            EmailOutcome {
                sent: true,
                error: None,
            },
        ),
        Err(e) => {
            log::warn!("Invoice {} saved but the email failed: {}", invoice.id, e);
            (
                invoice,
                EmailOutcome {
                    sent: false,
                    error: Some(e.public_message()),
                },
            )
        }
    }
}

/// Moves the invoice's email to `scheduled_at`; the cron run sends it.
pub async fn schedule_invoice_email(
    pool: &PgPool,
    user_id: Uuid,
    invoice_id: Uuid,
    scheduled_at: NaiveDateTime,
) -> Res<Invoice> {
    ensure_future(scheduled_at, Utc::now().naive_utc())?;
    let invoice = db::invoice::schedule_email(pool, user_id, invoice_id, scheduled_at)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;
    log::info!("Invoice {} email scheduled for {}", invoice.id, scheduled_at);
    Ok(invoice)
}
