use common::misc::Plan;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PlanOffer {
    pub id: Plan,
    pub name: String,
    pub description: String,
    /// Monthly price in cents.
    pub price: i64,
    pub currency: String,
    pub interval: String,
    /// `None` when unlimited.
    pub invoice_limit: Option<i64>,
    pub features: Vec<String>,
}
