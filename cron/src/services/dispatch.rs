use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::error::Res;
use db::models::{invoice::DueInvoiceEmail, smtp::UserSmtp};
use mailer::{InvoiceEmailData, InvoiceMailer, compose_invoice_email};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Storage side of the scheduled-email run.
#[async_trait]
pub trait ScheduledEmailQueue: Send + Sync {
    /// Unsent scheduled emails due at `now`, oldest first.
    async fn due(&self, now: NaiveDateTime) -> Res<Vec<DueInvoiceEmail>>;
    /// Marks the email sent unless someone else already did. Returns whether this caller won.
    async fn claim(&self, invoice_id: Uuid, now: NaiveDateTime) -> Res<bool>;
    /// Puts a claimed email back so a later run retries it.
    async fn release(&self, invoice_id: Uuid) -> Res<()>;
    async fn sender_smtp(&self, user_id: Uuid) -> Res<Option<UserSmtp>>;
}

pub struct PgScheduledEmailQueue {
    pool: Arc<PgPool>,
}

impl PgScheduledEmailQueue {
    pub fn new(pool: Arc<PgPool>) -> Self {
        PgScheduledEmailQueue { pool }
    }
}

#[async_trait]
impl ScheduledEmailQueue for PgScheduledEmailQueue {
    async fn due(&self, now: NaiveDateTime) -> Res<Vec<DueInvoiceEmail>> {
        db::invoice::get_due_scheduled_emails(&*self.pool, now).await
    }

    async fn claim(&self, invoice_id: Uuid, now: NaiveDateTime) -> Res<bool> {
        db::invoice::claim_scheduled_email(&*self.pool, invoice_id, now).await
    }

    async fn release(&self, invoice_id: Uuid) -> Res<()> {
        db::invoice::release_scheduled_email(&*self.pool, invoice_id).await
    }

    async fn sender_smtp(&self, user_id: Uuid) -> Res<Option<UserSmtp>> {
        db::smtp::get_user_smtp(&*self.pool, user_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Sent,
    Failed,
    /// Another run claimed it first.
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DispatchResult {
    pub invoice_id: Uuid,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<DispatchResult>,
}

/// Where the dispatcher takes its sender-independent settings from.
pub struct DispatchContext<'a> {
    pub currency: &'a str,
    pub base_url: &'a str,
}

async fn send_one(
    queue: &dyn ScheduledEmailQueue,
    mailer: &dyn InvoiceMailer,
    ctx: &DispatchContext<'_>,
    due: &DueInvoiceEmail,
) -> Res<()> {
    let smtp = queue.sender_smtp(due.invoice.user_id).await?;
    let email = compose_invoice_email(
        InvoiceEmailData {
            invoice: &due.invoice,
            client_name: &due.client_name,
            client_email: &due.client_email,
            sender_name: &due.sender_name,
            sender_email: &due.sender_email,
            currency: ctx.currency,
            base_url: ctx.base_url,
        },
        smtp,
    )?;
    mailer.send(&email).await
}

/// Sends every due scheduled email, one at a time.
///
/// Each row is claimed before sending so overlapping runs never send it
/// twice. A failed claim or send is recorded for that invoice only; a failed
/// send also releases the claim.
pub async fn dispatch_due(
    queue: &dyn ScheduledEmailQueue,
    mailer: &dyn InvoiceMailer,
    ctx: &DispatchContext<'_>,
    now: NaiveDateTime,
) -> Res<DispatchSummary> {
    let due = queue.due(now).await?;
    log::info!("Scheduled email run: {} due", due.len());

    let mut results = Vec::with_capacity(due.len());
    for item in &due {
        let invoice_id = item.invoice.id;

        match queue.claim(invoice_id, now).await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("Scheduled email for invoice {} already claimed", invoice_id);
                results.push(DispatchResult {
                    invoice_id,
                    status: DispatchStatus::Skipped,
                    error: None,
                });
                continue;
            }
            Err(e) => {
                log::error!("Could not claim invoice {} for sending: {}", invoice_id, e);
                results.push(DispatchResult {
                    invoice_id,
                    status: DispatchStatus::Failed,
                    error: Some(e.public_message()),
                });
                continue;
            }
        }

        match send_one(queue, mailer, ctx, item).await {
            Ok(()) => results.push(DispatchResult {
                invoice_id,
                status: DispatchStatus::Sent,
                error: None,
            }),
            Err(e) => {
                log::error!("Scheduled email for invoice {} failed: {}", invoice_id, e);
                if let Err(release_err) = queue.release(invoice_id).await {
                    log::error!(
                        "Could not release invoice {} for retry: {}",
                        invoice_id,
                        release_err
                    );
                }
                results.push(DispatchResult {
                    invoice_id,
                    status: DispatchStatus::Failed,
                    error: Some(e.public_message()),
                });
            }
        }
    }

    Ok(DispatchSummary {
        success: true,
        processed: results.len(),
        results,
    })
}
