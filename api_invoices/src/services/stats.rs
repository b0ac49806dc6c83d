use chrono::{NaiveDateTime, Utc};
use common::{env_config::Config, error::Res, misc::InvoiceStatus};
use currency::RateCache;
use db::{dtos::invoice::InvoiceFilter, models::invoice::Invoice};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::invoice::{InvoiceStats, InvoiceView, RecentInvoice};

const RECENT_INVOICES: usize = 5;

/// Aggregates the dashboard numbers. `invoices` must be newest first and
/// `rate` converts stored amounts into the display currency.
pub fn summarize(
    invoices: &[Invoice],
    now: NaiveDateTime,
    base_currency: &str,
    currency: &str,
    rate: f64,
) -> InvoiceStats {
    let views: Vec<InvoiceView> = invoices.iter().map(|i| InvoiceView::new(i, now)).collect();

    let sum_where = |status: InvoiceStatus| -> f64 {
        views
            .iter()
            .filter(|v| v.status == status)
            .map(|v| v.total)
            .sum()
    };
    let count_where = |status: InvoiceStatus| views.iter().filter(|v| v.status == status).count();

    let paid = sum_where(InvoiceStatus::Paid);
    let unpaid = sum_where(InvoiceStatus::Unpaid);
    let overdue = sum_where(InvoiceStatus::Overdue);

    InvoiceStats {
        base_currency: base_currency.to_string(),
        currency: currency.to_string(),
        rate,
        total_invoices: views.len(),
        paid_count: count_where(InvoiceStatus::Paid),
        unpaid_count: count_where(InvoiceStatus::Unpaid),
        overdue_count: count_where(InvoiceStatus::Overdue),
        total_revenue: paid * rate,
        outstanding: (unpaid + overdue) * rate,
        overdue_amount: overdue * rate,
        recent_invoices: views
            .iter()
            .take(RECENT_INVOICES)
            .map(|view| RecentInvoice {
                display_total: view.total * rate,
                view: view.clone(),
            })
            .collect(),
    }
}

pub async fn get_stats(
    pool: &PgPool,
    rates: &RateCache,
    config: &Config,
    user_id: Uuid,
    currency: Option<&str>,
) -> Res<InvoiceStats> {
    let base = config.currency.default_currency.as_str();
    let target = currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| base.to_string());

    let rate = if target == base {
        1.0
    } else {
        rates.rates(base).await?.convert(1.0, base, &target)?
    };

    let invoices = db::invoice::get_invoices_for_user(pool, user_id, InvoiceFilter::default()).await?;
    Ok(summarize(&invoices, Utc::now().naive_utc(), base, &target, rate))
}
