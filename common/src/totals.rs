//! Invoice money math. Every place that shows or sends an invoice total
//! goes through [`calculate_total`] or [`invoice_breakdown`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub rate: f64,
    pub amount: f64,
}

impl LineItem {
    /// Builds an item whose extended amount is `quantity * rate`.
    pub fn new(description: impl Into<String>, quantity: f64, rate: f64) -> Self {
        LineItem {
            description: description.into(),
            quantity,
            rate,
            amount: quantity * rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TotalsBreakdown {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub shipping: f64,
    pub total: f64,
    /// False when the total is the stored flat amount.
    pub itemized: bool,
}

/// Parses serialized line items.
///
/// Returns `None` for absent, blank, unparseable or empty lists so callers
/// fall back to the stored amount.
pub fn parse_line_items(raw: Option<&str>) -> Option<Vec<LineItem>> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match serde_json::from_str::<Vec<LineItem>>(raw) {
        Ok(items) if !items.is_empty() => Some(items),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Ignoring malformed line items, using stored amount: {}", e);
            None
        }
    }
}

pub fn serialize_line_items(items: &[LineItem]) -> String {
    // a Vec of plain structs cannot fail to serialize
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// subtotal + subtotal * tax_rate / 100 + shipping - discount
pub fn breakdown(items: &[LineItem], tax_rate: f64, discount: f64, shipping: f64) -> TotalsBreakdown {
    let subtotal: f64 = items.iter().map(|item| item.amount).sum();
    let tax = subtotal * tax_rate / 100.0;
    TotalsBreakdown {
        subtotal,
        tax,
        discount,
        shipping,
        total: subtotal + tax + shipping - discount,
        itemized: true,
    }
}

pub fn invoice_breakdown(
    line_items: Option<&str>,
    tax_rate: f64,
    discount: f64,
    shipping: f64,
    amount: f64,
) -> TotalsBreakdown {
    match parse_line_items(line_items) {
        Some(items) => breakdown(&items, tax_rate, discount, shipping),
        None => TotalsBreakdown {
            subtotal: amount,
            tax: 0.0,
            discount: 0.0,
            shipping: 0.0,
            total: amount,
            itemized: false,
        },
    }
}

pub fn calculate_total(
    line_items: Option<&str>,
    tax_rate: f64,
    discount: f64,
    shipping: f64,
    amount: f64,
) -> f64 {
    invoice_breakdown(line_items, tax_rate, discount, shipping, amount).total
}

/// Two-decimal amount prefixed with the currency code, e.g. `USD 1250.00`.
pub fn format_money(amount: f64, currency: &str) -> String {
    format!("{} {:.2}", currency, amount)
}
