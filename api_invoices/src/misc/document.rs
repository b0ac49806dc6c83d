//! Printable invoice page. The browser's print dialog is the "save as PDF" path.

use chrono::NaiveDateTime;
use common::{
    error::Res,
    misc::{InvoiceStatus, invoice_reference},
    totals::{format_money, parse_line_items},
};
use db::models::{client::Client, invoice::Invoice, user::User};
use serde::Serialize;
use tera::{Context, Tera};

use crate::dtos::invoice::breakdown_of;

const DOCUMENT_TEMPLATE: &str = "invoice_document.html";
const DATE_FORMAT: &str = "%B %-d, %Y";

#[derive(Serialize)]
struct ItemRow {
    description: String,
    quantity: String,
    rate: String,
    amount: String,
}

#[derive(Serialize)]
struct DocumentView<'a> {
    reference: String,
    status: &'static str,
    logo: Option<&'a str>,
    sender_name: &'a str,
    sender_email: &'a str,
    client_name: &'a str,
    client_email: &'a str,
    issued: String,
    due_date: String,
    paid_at: Option<String>,
    items: Vec<ItemRow>,
    itemized: bool,
    subtotal: String,
    tax_rate: f64,
    tax: String,
    shipping: String,
    discount: String,
    total: String,
    notes: Option<&'a str>,
}

pub fn render_document(
    invoice: &Invoice,
    client: &Client,
    sender: &User,
    currency: &str,
    now: NaiveDateTime,
) -> Res<String> {
    let money = |amount: f64| format_money(amount, currency);
    let totals = breakdown_of(invoice);
    let items = parse_line_items(invoice.line_items.as_deref())
        .unwrap_or_default()
        .into_iter()
        .map(|item| ItemRow {
            description: item.description,
            quantity: item.quantity.to_string(),
            rate: money(item.rate),
            amount: money(item.amount),
        })
        .collect();

    let view = DocumentView {
        reference: invoice_reference(&invoice.id),
        status: InvoiceStatus::derive(&invoice.status, invoice.due_date, now).as_str(),
        logo: invoice.logo.as_deref().filter(|l| !l.is_empty()),
        sender_name: &sender.name,
        sender_email: &sender.email,
        client_name: &client.name,
        client_email: &client.email,
        issued: invoice.created_at.format(DATE_FORMAT).to_string(),
        due_date: invoice.due_date.format(DATE_FORMAT).to_string(),
        paid_at: invoice.paid_at.map(|at| at.format(DATE_FORMAT).to_string()),
        items,
        itemized: totals.itemized,
        subtotal: money(totals.subtotal),
        tax_rate: invoice.tax_rate,
        tax: money(totals.tax),
        shipping: money(totals.shipping),
        discount: money(totals.discount),
        total: money(totals.total),
        notes: invoice.notes.as_deref().filter(|n| !n.trim().is_empty()),
    };

    let mut tera = Tera::default();
    tera.add_raw_template(
        DOCUMENT_TEMPLATE,
        include_str!("../../templates/invoice_document.html"),
    )?;
    let html = tera.render(DOCUMENT_TEMPLATE, &Context::from_serialize(&view)?)?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn fixtures(now: NaiveDateTime) -> (Invoice, Client, User) {
        let user = User {
            id: Uuid::new_v4(),
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            plan: "FREE".to_string(),
            created_at: now,
            updated_at: now,
        };
        let client = Client {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: "Acme".to_string(),
            email: "billing@acme.test".to_string(),
            created_at: now,
            updated_at: now,
        };
        let invoice = Invoice {
            id: Uuid::new_v4(),
            user_id: user.id,
            client_id: client.id,
            amount: 125.0,
            status: "UNPAID".to_string(),
            due_date: now - Duration::days(1),
            created_at: now - Duration::days(15),
            paid_at: None,
            notes: Some("Net 14".to_string()),
            logo: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
            line_items: Some(
                r#"[{"description":"Logo design","quantity":2,"rate":50,"amount":100}]"#.to_string(),
            ),
            tax_rate: 10.0,
            discount: 5.0,
            shipping: 20.0,
            email_send_option: "save_only".to_string(),
            email_scheduled_at: None,
            email_sent: false,
            email_sent_at: None,
        };
        (invoice, client, user)
    }

    #[test]
    fn document_lists_items_totals_and_prints_on_load() {
        let now = Utc::now().naive_utc();
        let (invoice, client, user) = fixtures(now);
        let html = render_document(&invoice, &client, &user, "USD", now).unwrap();

        assert!(html.contains("Logo design"));
        assert!(html.contains("USD 100.00"));
        assert!(html.contains("USD 10.00"));
        assert!(html.contains("USD 125.00"));
        assert!(html.contains("Acme"));
        assert!(html.contains("Jane Doe"));
        assert!(html.contains("Net 14"));
        assert!(html.contains("window.print()"));
        assert!(html.contains(&invoice_reference(&invoice.id)));
    }

    #[test]
    fn document_shows_the_derived_status() {
        let now = Utc::now().naive_utc();
        let (invoice, client, user) = fixtures(now);
        let html = render_document(&invoice, &client, &user, "USD", now).unwrap();
        assert!(html.contains("status-OVERDUE"));
    }

    #[test]
    fn user_content_is_escaped() {
        let now = Utc::now().naive_utc();
        let (mut invoice, mut client, user) = fixtures(now);
        client.name = "<img src=x onerror=alert(1)>".to_string();
        invoice.notes = Some("</div><script>steal()</script>".to_string());
        let html = render_document(&invoice, &client, &user, "USD", now).unwrap();

        assert!(!html.contains("<img src=x"));
        assert!(!html.contains("<script>steal()"));
        assert!(html.contains("&lt;script&gt;steal()"));
    }

    #[test]
    fn flat_invoice_renders_a_single_line() {
        let now = Utc::now().naive_utc();
        let (mut invoice, client, user) = fixtures(now);
        invoice.line_items = None;
        invoice.amount = 300.0;
        let html = render_document(&invoice, &client, &user, "EUR", now).unwrap();
        assert!(html.contains("Services"));
        assert!(html.contains("EUR 300.00"));
        assert!(!html.contains("Subtotal"));
    }
}
