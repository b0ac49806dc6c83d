use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, password_hash::PasswordHasher};
use common::error::{AppError, Res};
use db::dtos::user::UserCreateRequest;
use db::models::user::{AuthCredentials, User};

use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::auth::SignUpRequest;

pub async fn exists_user_by_email(pool: &PgPool, email: &str) -> Res<bool> {
    db::user::exists_user_by_email(pool, email).await
}

pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Res<User> {
    db::user::get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Inserts user record and credentials in one transaction.
pub async fn create_user_with_credentials(pool: &PgPool, req: &SignUpRequest) -> Res<User> {
    let password_hash = hash_password(&req.password)?;

    let mut tx = pool.begin().await?;

    let user = db::user::insert_user(
        &mut *tx,
        UserCreateRequest {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
        },
    )
    .await
    .map_err(duplicate_email_as_bad_request)?;

    db::user::insert_user_with_credentials(
        &mut *tx,
        AuthCredentials {
            user_id: user.id,
            password_hash,
        },
    )
    .await?;

    tx.commit().await?;
    log::info!("Registered user {}", user.id);
    Ok(user)
}

/// A concurrent signup can pass the existence check and still lose the race
/// on `users.email`.
fn duplicate_email_as_bad_request(err: AppError) -> AppError {
    match &err {
        AppError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            AppError::BadRequest("User already exists".to_string())
        }
        _ => err,
    }
}

pub(crate) fn hash_password(password: &str) -> Res<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}
