use chrono::NaiveDateTime;
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    dtos::invoice::{InvoiceCreateRequest, InvoiceFilter},
    models::invoice::{DueInvoiceEmail, Invoice},
};

pub async fn count_invoices_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_invoice<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: InvoiceCreateRequest,
) -> Res<Invoice> {
    sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices (
            user_id, client_id, amount, due_date, notes, logo, line_items,
            tax_rate, discount, shipping, email_send_option, email_scheduled_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.client_id)
    .bind(data.amount)
    .bind(data.due_date)
    .bind(data.notes)
    .bind(data.logo)
    .bind(data.line_items)
    .bind(data.tax_rate)
    .bind(data.discount)
    .bind(data.shipping)
    .bind(data.email_send_option.as_str())
    .bind(data.email_scheduled_at)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Lists the user's invoices, newest first.
pub async fn get_invoices_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
    filter: InvoiceFilter,
) -> Res<Vec<Invoice>>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM invoices WHERE user_id = ");
    qb.push_bind(user_id);

    if let Some(client_id) = filter.client_id {
        qb.push(" AND client_id = ").push_bind(client_id);
    }

    qb.push(" ORDER BY created_at DESC");

    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    qb.build_query_as::<Invoice>()
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

/// Fetches an invoice only when it belongs to `user_id`.
pub async fn get_invoice_for_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    invoice_id: Uuid,
) -> Res<Option<Invoice>> {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 AND user_id = $2")
        .bind(invoice_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn mark_invoice_paid<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    invoice_id: Uuid,
    paid_at: NaiveDateTime,
) -> Res<Option<Invoice>> {
    sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices SET status = 'PAID', paid_at = $3
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(invoice_id)
    .bind(user_id)
    .bind(paid_at)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Stamps a manual or immediate send.
pub async fn mark_email_sent<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    invoice_id: Uuid,
    sent_at: NaiveDateTime,
) -> Res<Option<Invoice>> {
    sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices SET email_sent = TRUE, email_sent_at = $3
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(invoice_id)
    .bind(user_id)
    .bind(sent_at)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn schedule_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    invoice_id: Uuid,
    scheduled_at: NaiveDateTime,
) -> Res<Option<Invoice>> {
    sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices
        SET email_send_option = 'schedule',
            email_scheduled_at = $3,
            email_sent = FALSE,
            email_sent_at = NULL
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(invoice_id)
    .bind(user_id)
    .bind(scheduled_at)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Scheduled emails whose time has come and that have not been sent, oldest first.
pub async fn get_due_scheduled_emails<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    now: NaiveDateTime,
) -> Res<Vec<DueInvoiceEmail>> {
    sqlx::query_as::<_, DueInvoiceEmail>(
        r#"
        SELECT i.*,
               c.name AS client_name,
               c.email AS client_email,
               u.name AS sender_name,
               u.email AS sender_email
        FROM invoices i
        JOIN clients c ON c.id = i.client_id
        JOIN users u ON u.id = i.user_id
        WHERE i.email_send_option = 'schedule'
          AND i.email_scheduled_at <= $1
          AND i.email_sent = FALSE
        ORDER BY i.email_scheduled_at ASC
        "#,
    )
    .bind(now)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Atomically marks a scheduled email as sent. Returns false when another
/// run already claimed it.
pub async fn claim_scheduled_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    invoice_id: Uuid,
    now: NaiveDateTime,
) -> Res<bool> {
    let claimed: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE invoices SET email_sent = TRUE, email_sent_at = $2
        WHERE id = $1 AND email_sent = FALSE
        RETURNING id
        "#,
    )
    .bind(invoice_id)
    .bind(now)
    .fetch_optional(executor)
    .await?;
    Ok(claimed.is_some())
}

/// Undoes a claim after a failed send so the next run retries it.
pub async fn release_scheduled_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    invoice_id: Uuid,
) -> Res<()> {
    sqlx::query("UPDATE invoices SET email_sent = FALSE, email_sent_at = NULL WHERE id = $1")
        .bind(invoice_id)
        .execute(executor)
        .await?;
    Ok(())
}
