use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{dtos::client::CreateClientRequest, services};

/// Adds a client to the caller's address book.
///
/// # Output
/// - Success: the created client with 201 Created
/// - Error: 400 Bad Request for a blank name or an invalid email
#[post("")]
pub async fn post_client(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    req: web::Json<CreateClientRequest>,
) -> Res<impl Responder> {
    let client = services::client::create_client(&pool, claims.user_id, &req).await?;
    Success::created(client)
}

/// The caller's clients with their invoice counts, newest first.
#[get("")]
pub async fn get_clients(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let clients = services::client::list_clients(&pool, claims.user_id).await?;
    Success::ok(clients)
}

#[get("/{id}")]
pub async fn get_client(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let detail = services::client::get_client_detail(&pool, claims.user_id, path.into_inner()).await?;
    Success::ok(detail)
}
