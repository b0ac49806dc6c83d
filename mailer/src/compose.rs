use common::{
    error::Res,
    misc::invoice_reference,
    totals::{format_money, invoice_breakdown, parse_line_items},
};
use db::models::{invoice::Invoice, smtp::UserSmtp};
use serde::Serialize;
use tera::{Context, Tera};
use uuid::Uuid;

const HTML_TEMPLATE: &str = "invoice_email.html";
const TEXT_TEMPLATE: &str = "invoice_email.txt";

/// A rendered invoice email, ready to hand to an [`crate::InvoiceMailer`].
#[derive(Debug, Clone)]
pub struct InvoiceEmail {
    pub invoice_id: Uuid,
    pub to_email: String,
    pub to_name: String,
    /// The sender's own address, so client replies reach them.
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
    /// Sender's transport settings; only used when `use_custom` is set.
    pub smtp: Option<UserSmtp>,
}

pub struct InvoiceEmailData<'a> {
    pub invoice: &'a Invoice,
    pub client_name: &'a str,
    pub client_email: &'a str,
    pub sender_name: &'a str,
    pub sender_email: &'a str,
    pub currency: &'a str,
    pub base_url: &'a str,
}

#[derive(Serialize)]
struct ItemView {
    description: String,
    quantity: String,
    rate: String,
    amount: String,
}

#[derive(Serialize)]
struct EmailView<'a> {
    sender_name: &'a str,
    client_name: &'a str,
    reference: String,
    total: String,
    subtotal: String,
    tax: String,
    shipping: String,
    discount: String,
    due_date: String,
    notes: Option<&'a str>,
    items: Vec<ItemView>,
    link: String,
}

pub fn invoice_link(base_url: &str, invoice_id: &Uuid) -> String {
    format!("{}/invoices/{}", base_url.trim_end_matches('/'), invoice_id)
}

fn templates() -> Res<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (HTML_TEMPLATE, include_str!("../templates/invoice_email.html")),
        (TEXT_TEMPLATE, include_str!("../templates/invoice_email.txt")),
    ])?;
    Ok(tera)
}

pub fn compose_invoice_email(
    data: InvoiceEmailData<'_>,
    smtp: Option<UserSmtp>,
) -> Res<InvoiceEmail> {
    let invoice = data.invoice;
    let money = |amount: f64| format_money(amount, data.currency);
    let totals = invoice_breakdown(
        invoice.line_items.as_deref(),
        invoice.tax_rate,
        invoice.discount,
        invoice.shipping,
        invoice.amount,
    );
    let items = parse_line_items(invoice.line_items.as_deref())
        .unwrap_or_default()
        .into_iter()
        .map(|item| ItemView {
            description: item.description,
            quantity: item.quantity.to_string(),
            rate: money(item.rate),
            amount: money(item.amount),
        })
        .collect();

    let view = EmailView {
        sender_name: data.sender_name,
        client_name: data.client_name,
        reference: invoice_reference(&invoice.id),
        total: money(totals.total),
        subtotal: money(totals.subtotal),
        tax: money(totals.tax),
        shipping: money(totals.shipping),
        discount: money(totals.discount),
        due_date: invoice.due_date.format("%B %-d, %Y").to_string(),
        notes: invoice.notes.as_deref().filter(|n| !n.trim().is_empty()),
        items,
        link: invoice_link(data.base_url, &invoice.id),
    };

    let tera = templates()?;
    let context = Context::from_serialize(&view)?;

    Ok(InvoiceEmail {
        invoice_id: invoice.id,
        to_email: data.client_email.to_string(),
        to_name: data.client_name.to_string(),
        reply_to: Some(data.sender_email.to_string()).filter(|e| !e.is_empty()),
        subject: format!("Invoice from {}: {}", data.sender_name, view.total),
        html: tera.render(HTML_TEMPLATE, &context)?,
        text: tera.render(TEXT_TEMPLATE, &context)?,
        smtp,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn invoice(line_items: Option<&str>) -> Invoice {
        let now = Utc::now().naive_utc();
        Invoice {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            amount: 300.0,
            status: "UNPAID".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            created_at: now,
            paid_at: None,
            notes: Some("Thanks for your business".to_string()),
            logo: None,
            line_items: line_items.map(str::to_string),
            tax_rate: 10.0,
            discount: 5.0,
            shipping: 20.0,
            email_send_option: "send_now".to_string(),
            email_scheduled_at: None,
            email_sent: false,
            email_sent_at: None,
        }
    }

    fn data<'a>(invoice: &'a Invoice, client_name: &'a str) -> InvoiceEmailData<'a> {
        InvoiceEmailData {
            invoice,
            client_name,
            client_email: "billing@acme.test",
            sender_name: "Jane Doe",
            sender_email: "jane@example.com",
            currency: "USD",
            base_url: "https://app.paytrack.test/",
        }
    }

    #[test]
    fn itemized_email_shows_the_calculated_total() {
        let inv = invoice(Some(
            r#"[{"description":"Logo design","quantity":2,"rate":50,"amount":100}]"#,
        ));
        let email = compose_invoice_email(data(&inv, "Acme"), None).unwrap();

        assert_eq!(email.subject, "Invoice from Jane Doe: USD 125.00");
        assert!(email.html.contains("Logo design"));
        assert!(email.html.contains("USD 125.00"));
        assert!(email.text.contains("Total: USD 125.00"));
        assert!(email.text.contains("March 9, 2025"));
        assert_eq!(email.reply_to.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn flat_invoice_uses_the_stored_amount() {
        let inv = invoice(None);
        let email = compose_invoice_email(data(&inv, "Acme"), None).unwrap();
        assert!(email.subject.ends_with("USD 300.00"));
        assert!(!email.html.contains("Subtotal"));
    }

    #[test]
    fn text_body_links_to_the_invoice() {
        let inv = invoice(None);
        let email = compose_invoice_email(data(&inv, "Acme"), None).unwrap();
        let link = format!("https://app.paytrack.test/invoices/{}", inv.id);
        assert!(email.text.contains(&link));
    }

    #[test]
    fn html_body_escapes_user_content() {
        let inv = invoice(None);
        let email = compose_invoice_email(data(&inv, "<script>alert(1)</script>"), None).unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
    }
}
