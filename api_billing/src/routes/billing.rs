use std::sync::Arc;

use actix_web::{Responder, get, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use sqlx::PgPool;

use crate::{dtos::billing::PlansResponse, services};

/// Current plan, invoice usage against its cap, and the plan catalogue.
#[get("")]
pub async fn get_overview(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let overview = services::billing::get_overview(&pool, claims.user_id).await?;
    Success::ok(overview)
}

#[get("/plans")]
pub async fn get_plans() -> Res<impl Responder> {
    Success::ok(PlansResponse {
        plans: services::billing::plan_catalogue(),
    })
}
