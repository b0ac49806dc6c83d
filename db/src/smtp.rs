use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::smtp::UserSmtpUpsertRequest, models::smtp::UserSmtp};

pub async fn get_user_smtp<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<UserSmtp>> {
    sqlx::query_as::<_, UserSmtp>("SELECT * FROM user_smtp WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts or replaces the user's SMTP settings. A `None` password keeps the stored one.
pub async fn upsert_user_smtp<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserSmtpUpsertRequest,
) -> Res<UserSmtp> {
    sqlx::query_as::<_, UserSmtp>(
        r#"
        INSERT INTO user_smtp
            (user_id, host, port, username, password, from_email, from_name, secure, use_custom)
        VALUES ($1, $2, $3, $4, COALESCE($5, ''), $6, $7, $8, $9)
        ON CONFLICT (user_id) DO UPDATE SET
            host = EXCLUDED.host,
            port = EXCLUDED.port,
            username = EXCLUDED.username,
            password = COALESCE($5, user_smtp.password),
            from_email = EXCLUDED.from_email,
            from_name = EXCLUDED.from_name,
            secure = EXCLUDED.secure,
            use_custom = EXCLUDED.use_custom,
            updated_at = (NOW() AT TIME ZONE 'utc')
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.host)
    .bind(data.port)
    .bind(data.username)
    .bind(data.password)
    .bind(data.from_email)
    .bind(data.from_name)
    .bind(data.secure)
    .bind(data.use_custom)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Returns whether a row was deleted.
pub async fn delete_user_smtp<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<bool> {
    let result = sqlx::query("DELETE FROM user_smtp WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
