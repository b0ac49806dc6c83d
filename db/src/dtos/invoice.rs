use chrono::NaiveDateTime;
use common::misc::EmailSendOption;
use uuid::Uuid;

pub struct InvoiceCreateRequest {
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub due_date: NaiveDateTime,
    pub notes: Option<String>,
    pub logo: Option<String>,
    /// Serialized line items
    pub line_items: Option<String>,
    pub tax_rate: f64,
    pub discount: f64,
    pub shipping: f64,
    pub email_send_option: EmailSendOption,
    pub email_scheduled_at: Option<NaiveDateTime>,
}

#[derive(Default)]
pub struct InvoiceFilter {
    pub client_id: Option<Uuid>,
    pub limit: Option<i64>,
}
