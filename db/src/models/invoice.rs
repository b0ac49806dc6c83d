use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice row as stored. `status` is only ever `UNPAID` or `PAID`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub status: String,
    pub due_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub logo: Option<String>,
    pub line_items: Option<String>,
    pub tax_rate: f64,
    pub discount: f64,
    pub shipping: f64,
    pub email_send_option: String,
    pub email_scheduled_at: Option<NaiveDateTime>,
    pub email_sent: bool,
    pub email_sent_at: Option<NaiveDateTime>,
}

/// A scheduled email that is due, with what is needed to address it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueInvoiceEmail {
    #[sqlx(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
    pub client_email: String,
    pub sender_name: String,
    pub sender_email: String,
}
