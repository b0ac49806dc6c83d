use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::{
    misc::{EmailSendOption, InvoiceStatus},
    totals::{LineItem, TotalsBreakdown, invoice_breakdown, parse_line_items},
};
use db::models::{client::Client, invoice::Invoice};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accepts `2025-03-09`, `2025-03-09T10:00:00` or an RFC 3339 instant.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Instant(DateTime<Utc>),
    Local(NaiveDateTime),
    Day(NaiveDate),
}

impl DateInput {
    pub fn naive_utc(self) -> NaiveDateTime {
        match self {
            DateInput::Instant(at) => at.naive_utc(),
            DateInput::Local(at) => at,
            DateInput::Day(day) => day.and_time(NaiveTime::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    /// Flat amount; defaults to the line item total.
    pub amount: Option<f64>,
    pub due_date: DateInput,
    pub notes: Option<String>,
    /// Data URL or http(s) URL of the sender's logo.
    pub logo: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItemInput>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub email_send_option: EmailSendOption,
    pub email_scheduled_at: Option<DateInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_at: DateInput,
}

/// An invoice as users see it: derived status and effective total.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    pub id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub due_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub email_send_option: String,
    pub email_scheduled_at: Option<NaiveDateTime>,
    pub email_sent: bool,
    pub email_sent_at: Option<NaiveDateTime>,
}

impl InvoiceView {
    pub fn new(invoice: &Invoice, now: NaiveDateTime) -> Self {
        InvoiceView {
            id: invoice.id,
            client_id: invoice.client_id,
            amount: invoice.amount,
            total: breakdown_of(invoice).total,
            status: InvoiceStatus::derive(&invoice.status, invoice.due_date, now),
            due_date: invoice.due_date,
            created_at: invoice.created_at,
            paid_at: invoice.paid_at,
            notes: invoice.notes.clone(),
            email_send_option: invoice.email_send_option.clone(),
            email_scheduled_at: invoice.email_scheduled_at,
            email_sent: invoice.email_sent,
            email_sent_at: invoice.email_sent_at,
        }
    }
}

pub fn breakdown_of(invoice: &Invoice) -> TotalsBreakdown {
    invoice_breakdown(
        invoice.line_items.as_deref(),
        invoice.tax_rate,
        invoice.discount,
        invoice.shipping,
        invoice.amount,
    )
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub view: InvoiceView,
    pub client: Client,
    pub logo: Option<String>,
    pub line_items: Vec<LineItem>,
    pub tax_rate: f64,
    pub discount: f64,
    pub shipping: f64,
    pub breakdown: TotalsBreakdown,
}

impl InvoiceDetail {
    pub fn new(invoice: &Invoice, client: Client, now: NaiveDateTime) -> Self {
        InvoiceDetail {
            view: InvoiceView::new(invoice, now),
            client,
            logo: invoice.logo.clone(),
            line_items: parse_line_items(invoice.line_items.as_deref()).unwrap_or_default(),
            tax_rate: invoice.tax_rate,
            discount: invoice.discount,
            shipping: invoice.shipping,
            breakdown: breakdown_of(invoice),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailOutcome {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
    pub invoice: InvoiceView,
    /// Present only for `send_now`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailOutcome>,
}

#[derive(Debug, Serialize)]
pub struct RecentInvoice {
    #[serde(flatten)]
    pub view: InvoiceView,
    /// `total` in the display currency.
    pub display_total: f64,
}

#[derive(Debug, Serialize)]
pub struct InvoiceStats {
    /// Currency amounts are stored in.
    pub base_currency: String,
    /// Currency of every amount below except the views' own `amount`/`total`.
    pub currency: String,
    pub rate: f64,
    pub total_invoices: usize,
    pub paid_count: usize,
    pub unpaid_count: usize,
    pub overdue_count: usize,
    pub total_revenue: f64,
    pub outstanding: f64,
    pub overdue_amount: f64,
    pub recent_invoices: Vec<RecentInvoice>,
}
