use chrono::{NaiveDateTime, Utc};
use common::{
    error::{AppError, Res},
    misc::{EmailSendOption, InvoiceStatus, Plan},
    totals::{LineItem, breakdown, serialize_line_items},
};
use db::{
    dtos::invoice::{InvoiceCreateRequest, InvoiceFilter},
    models::invoice::Invoice,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::invoice::{CreateInvoiceRequest, InvoiceDetail, InvoiceListQuery, InvoiceView};

/// A create request after validation, with server-computed money fields.
#[derive(Debug)]
pub struct ValidatedInvoice {
    pub line_items: Vec<LineItem>,
    pub amount: f64,
    pub due_date: NaiveDateTime,
    pub email_scheduled_at: Option<NaiveDateTime>,
}

fn non_negative(value: f64, field: &str) -> Res<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AppError::BadRequest(format!(
            "{} must be a non-negative number",
            field
        )))
    }
}

/// Checks a create request and recomputes every line item as `quantity * rate`.
pub fn validate_create(req: &CreateInvoiceRequest, now: NaiveDateTime) -> Res<ValidatedInvoice> {
    let mut line_items = Vec::with_capacity(req.line_items.len());
    for item in &req.line_items {
        if item.description.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Line item description is required".to_string(),
            ));
        }
        let quantity = non_negative(item.quantity, "Quantity")?;
        let rate = non_negative(item.rate, "Rate")?;
        line_items.push(LineItem::new(item.description.trim(), quantity, rate));
    }

    let tax_rate = non_negative(req.tax_rate, "Tax rate")?;
    if tax_rate > 100.0 {
        return Err(AppError::BadRequest(
            "Tax rate cannot exceed 100".to_string(),
        ));
    }
    let discount = non_negative(req.discount, "Discount")?;
    let shipping = non_negative(req.shipping, "Shipping")?;

    let amount = match (req.amount, line_items.is_empty()) {
        (Some(amount), _) => non_negative(amount, "Amount")?,
        (None, false) => breakdown(&line_items, tax_rate, discount, shipping).total,
        (None, true) => {
            return Err(AppError::BadRequest(
                "Amount or at least one line item is required".to_string(),
            ));
        }
    };

    if let Some(logo) = req.logo.as_deref().filter(|l| !l.is_empty()) {
        let accepted = ["data:image/", "https://", "http://"];
        if !accepted.iter().any(|prefix| logo.starts_with(prefix)) {
            return Err(AppError::BadRequest(
                "Logo must be an image data URL or an http(s) URL".to_string(),
            ));
        }
    }

    let email_scheduled_at = match req.email_send_option {
        EmailSendOption::Schedule => {
            let at = req
                .email_scheduled_at
                .map(|at| at.naive_utc())
                .ok_or_else(|| {
                    AppError::BadRequest("A scheduled time is required to schedule the email".to_string())
                })?;
            ensure_future(at, now)?;
            Some(at)
        }
        _ => None,
    };

    Ok(ValidatedInvoice {
        line_items,
        amount,
        due_date: req.due_date.naive_utc(),
        email_scheduled_at,
    })
}

pub fn ensure_future(at: NaiveDateTime, now: NaiveDateTime) -> Res<()> {
    if at <= now {
        return Err(AppError::BadRequest(
            "Scheduled time must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Creates an invoice for one of the caller's clients.
///
/// The plan check and the insert share a transaction that holds a row lock
/// on the user, so concurrent requests cannot push a FREE user past the cap.
pub async fn create_invoice(
    pool: &PgPool,
    user_id: Uuid,
    req: &CreateInvoiceRequest,
) -> Res<Invoice> {
    let now = Utc::now().naive_utc();
    let valid = validate_create(req, now)?;

    let mut tx = pool.begin().await?;

    let plan = db::user::lock_user_plan(&mut *tx, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let plan = Plan::from_str(&plan)?;
    let count = db::invoice::count_invoices_by_user(&mut *tx, user_id).await?;
    plan.ensure_can_create_invoice(count)?;

    db::client::get_client_for_user(&mut *tx, user_id, req.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let line_items = if valid.line_items.is_empty() {
        None
    } else {
        Some(serialize_line_items(&valid.line_items))
    };

    let invoice = db::invoice::insert_invoice(
        &mut *tx,
        InvoiceCreateRequest {
            user_id,
            client_id: req.client_id,
            amount: valid.amount,
            due_date: valid.due_date,
            notes: req.notes.clone().filter(|n| !n.trim().is_empty()),
            logo: req.logo.clone().filter(|l| !l.is_empty()),
            line_items,
            tax_rate: req.tax_rate,
            discount: req.discount,
            shipping: req.shipping,
            email_send_option: req.email_send_option,
            email_scheduled_at: valid.email_scheduled_at,
        },
    )
    .await?;

    tx.commit().await?;
    log::info!(
        "Created invoice {} for user {} ({})",
        invoice.id,
        user_id,
        req.email_send_option
    );
    Ok(invoice)
}

pub async fn get_owned_invoice(pool: &PgPool, user_id: Uuid, invoice_id: Uuid) -> Res<Invoice> {
    db::invoice::get_invoice_for_user(pool, user_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))
}

/// Keeps the views whose derived status matches `status`, if given.
pub fn filter_views(
    invoices: &[Invoice],
    status: Option<InvoiceStatus>,
    now: NaiveDateTime,
) -> Vec<InvoiceView> {
    invoices
        .iter()
        .map(|invoice| InvoiceView::new(invoice, now))
        .filter(|view| status.is_none_or(|s| view.status == s))
        .collect()
}

pub async fn list_invoices(
    pool: &PgPool,
    user_id: Uuid,
    query: &InvoiceListQuery,
) -> Res<Vec<InvoiceView>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(InvoiceStatus::from_str)
        .transpose()?;
    let invoices = db::invoice::get_invoices_for_user(
        pool,
        user_id,
        InvoiceFilter {
            client_id: query.client_id,
            limit: None,
        },
    )
    .await?;
    Ok(filter_views(&invoices, status, Utc::now().naive_utc()))
}

pub async fn get_invoice_detail(pool: &PgPool, user_id: Uuid, invoice_id: Uuid) -> Res<InvoiceDetail> {
    let invoice = get_owned_invoice(pool, user_id, invoice_id).await?;
    let client = db::client::get_client_for_user(pool, user_id, invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(InvoiceDetail::new(&invoice, client, Utc::now().naive_utc()))
}

pub async fn mark_paid(pool: &PgPool, user_id: Uuid, invoice_id: Uuid) -> Res<InvoiceView> {
    let invoice = get_owned_invoice(pool, user_id, invoice_id).await?;
    if invoice.status == InvoiceStatus::Paid.as_str() {
        return Err(AppError::BadRequest("Invoice is already paid".to_string()));
    }

    let now = Utc::now().naive_utc();
    let paid = db::invoice::mark_invoice_paid(pool, user_id, invoice_id, now)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;
    log::info!("Invoice {} marked as paid", paid.id);
    Ok(InvoiceView::new(&paid, now))
}
