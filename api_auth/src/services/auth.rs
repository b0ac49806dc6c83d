use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use common::error::{AppError, Res};
use db::models::user::User;
use sqlx::PgPool;

use crate::dtos::auth::{SignInRequest, SignUpRequest};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Checks the sign-up form before anything touches the database.
pub fn validate_signup(req: &SignUpRequest) -> Res<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    req.email
        .trim()
        .parse::<lettre::Address>()
        .map_err(|_| AppError::BadRequest("A valid email is required".to_string()))?;
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Authenticates existing user.
/// Unknown emails and wrong passwords both return 401 with the same message.
pub async fn authenticate_user(pool: &PgPool, login_data: &SignInRequest) -> Res<User> {
    let email = login_data.email.trim().to_lowercase();
    let (user, credentials) = db::user::get_user_with_password_hash(pool, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if verify_password(&login_data.password, &credentials.password_hash)? {
        Ok(user)
    } else {
        Err(AppError::Unauthorized("Invalid credentials".to_string()))
    }
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> Res<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user::hash_password;

    fn signup(name: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn signup_requires_name_email_and_long_password() {
        assert!(validate_signup(&signup("Ada", "ada@example.com", "correct horse")).is_ok());
        assert!(validate_signup(&signup("  ", "ada@example.com", "correct horse")).is_err());
        assert!(validate_signup(&signup("Ada", "ada-at-example", "correct horse")).is_err());
        assert!(validate_signup(&signup("Ada", "ada@example.com", "short")).is_err());
    }

    #[test]
    fn password_hash_verifies_only_the_original_password() {
        let hash = hash_password("s3cret-password").unwrap();
        assert!(verify_password("s3cret-password", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }
}
