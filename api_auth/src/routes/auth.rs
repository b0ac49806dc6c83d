use actix_session::Session;
use actix_web::{Responder, post, web};
use common::env_config::Config;
use common::error::{AppError, Res};
use common::http::Success;
use common::jwt::{self, TokenSubject};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::dtos::auth::{AuthResponse, SignInRequest, SignUpRequest};
use crate::services;

/// Registers a new user with email and password.
///
/// # Input
/// - `req`: JSON payload with `name`, `email` and `password`
///
/// # Output
/// - Success: the created user with 201 Created
/// - Error: 400 Bad Request for invalid input or an email that is already registered
#[post("/signup")]
async fn post_signup(
    req: web::Json<SignUpRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    services::auth::validate_signup(&req)?;
    let email_taken = services::user::exists_user_by_email(pg_pool, &req.email.trim().to_lowercase()).await?;
    if email_taken {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }
    let user = services::user::create_user_with_credentials(pg_pool, &req.into_inner()).await?;
    Success::created(user)
}

/// Authenticates a user with email and password.
///
/// The issued token is returned in the body for API clients and stored in
/// the cookie session for the browser.
///
/// # Output
/// - Success: `{ token, user }`
/// - Error: 401 Unauthorized for invalid credentials
#[post("/signin")]
async fn post_signin(
    login_data: web::Json<SignInRequest>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    session: Session,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let user = services::auth::authenticate_user(pg_pool, &login_data.into_inner()).await?;
    let token = jwt::generate_jwt(
        TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
        },
        &config.jwt_config,
    )?;

    session.renew();
    session
        .insert("token", &token)
        .map_err(|_| AppError::Internal("Failed to insert token cookie".to_string()))?;
    session
        .insert("user", &user)
        .map_err(|_| AppError::Internal("Failed to insert user cookie".to_string()))?;

    Success::ok(AuthResponse { token, user })
}

/// Clears the cookie session.
#[post("/signout")]
async fn post_signout(session: Session) -> Res<impl Responder> {
    session.purge();
    Success::ok(json!({ "success": true }))
}
