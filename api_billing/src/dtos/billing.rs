use common::misc::Plan;
use serde::Serialize;

use crate::models::plan::PlanOffer;

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub invoice_count: i64,
    /// `None` when unlimited.
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BillingOverviewResponse {
    pub plan: Plan,
    pub usage: UsageResponse,
    pub plans: Vec<PlanOffer>,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanOffer>,
}
