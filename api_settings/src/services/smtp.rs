use common::error::{AppError, Res};
use db::dtos::smtp::UserSmtpUpsertRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dtos::smtp::{SaveSmtpRequest, SmtpSettingsView};

const DEFAULT_PORT: i32 = 587;

/// Normalizes the form into an upsert. Host, port and sender address are
/// only mandatory once the custom relay is switched on.
pub fn validate_smtp(user_id: Uuid, req: SaveSmtpRequest) -> Res<UserSmtpUpsertRequest> {
    let host = req.host.trim().to_string();
    let from_email = req.from_email.trim().to_string();

    if req.use_custom {
        if host.is_empty() {
            return Err(AppError::BadRequest("SMTP host is required".to_string()));
        }
        if req.port.is_none() {
            return Err(AppError::BadRequest("SMTP port is required".to_string()));
        }
        if from_email.is_empty() {
            return Err(AppError::BadRequest("From email is required".to_string()));
        }
    }

    let port = req.port.unwrap_or(DEFAULT_PORT);
    if !(1..=65535).contains(&port) {
        return Err(AppError::BadRequest(format!("Invalid SMTP port: {}", port)));
    }
    if !from_email.is_empty() {
        from_email
            .parse::<lettre::Address>()
            .map_err(|_| AppError::BadRequest("From email is not a valid address".to_string()))?;
    }

    Ok(UserSmtpUpsertRequest {
        user_id,
        host,
        port,
        username: req.username.trim().to_string(),
        password: req.password.filter(|p| !p.is_empty()),
        from_email,
        from_name: req.from_name.trim().to_string(),
        secure: req.secure,
        use_custom: req.use_custom,
    })
}

pub async fn save_smtp(pool: &PgPool, user_id: Uuid, req: SaveSmtpRequest) -> Res<SmtpSettingsView> {
    let upsert = validate_smtp(user_id, req)?;
    let saved = db::smtp::upsert_user_smtp(pool, upsert).await?;
    log::info!(
        "SMTP settings saved for user {} (custom relay {})",
        user_id,
        if saved.use_custom { "on" } else { "off" }
    );
    Ok(saved.into())
}

pub async fn get_smtp(pool: &PgPool, user_id: Uuid) -> Res<Option<SmtpSettingsView>> {
    Ok(db::smtp::get_user_smtp(pool, user_id).await?.map(Into::into))
}

pub async fn delete_smtp(pool: &PgPool, user_id: Uuid) -> Res<bool> {
    db::smtp::delete_user_smtp(pool, user_id).await
}
