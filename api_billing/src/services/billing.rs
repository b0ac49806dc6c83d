use common::{
    error::{AppError, Res},
    misc::Plan,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    dtos::billing::{BillingOverviewResponse, UsageResponse},
    models::plan::PlanOffer,
};

/// The plans a user can be on. Upgrading is not wired to a payment provider.
pub fn plan_catalogue() -> Vec<PlanOffer> {
    vec![
        PlanOffer {
            id: Plan::Free,
            name: "Free".to_string(),
            description: "Everything a freelancer needs to get paid".to_string(),
            price: 0,
            currency: "USD".to_string(),
            interval: "month".to_string(),
            invoice_limit: Plan::Free.invoice_limit(),
            features: vec![
                "Up to 1000 invoices".to_string(),
                "Email delivery and scheduling".to_string(),
                "Printable invoices".to_string(),
            ],
        },
        PlanOffer {
            id: Plan::Pro,
            name: "Pro".to_string(),
            description: "For busy freelancers and small studios".to_string(),
            price: 900,
            currency: "USD".to_string(),
            interval: "month".to_string(),
            invoice_limit: Plan::Pro.invoice_limit(),
            features: vec![
                "Unlimited invoices".to_string(),
                "Custom SMTP sender".to_string(),
                "Multi-currency dashboard".to_string(),
            ],
        },
    ]
}

pub fn usage(plan: Plan, invoice_count: i64) -> UsageResponse {
    let limit = plan.invoice_limit();
    UsageResponse {
        invoice_count,
        limit,
        remaining: limit.map(|limit| (limit - invoice_count).max(0)),
    }
}

pub async fn get_overview(pool: &PgPool, user_id: Uuid) -> Res<BillingOverviewResponse> {
    let user = db::user::get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let plan = Plan::from_str(&user.plan)?;
    let invoice_count = db::invoice::count_invoices_by_user(pool, user_id).await?;

    Ok(BillingOverviewResponse {
        plan,
        usage: usage(plan, invoice_count),
        plans: plan_catalogue(),
    })
}
