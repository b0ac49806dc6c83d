use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::user::UserCreateRequest,
    models::user::{AuthCredentials, User},
};

pub async fn exists_user_by_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Reads the user's plan and locks the user row until the transaction ends,
/// serializing invoice creation per user.
pub async fn lock_user_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<String>> {
    sqlx::query_scalar("SELECT plan FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(data.name)
    .bind(data.email)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_user_with_credentials<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: AuthCredentials,
) -> Res<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_credentials (user_id, password_hash)
        VALUES ($1, $2)
        "#,
    )
    .bind(data.user_id)
    .bind(data.password_hash)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_user_with_password_hash<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<(User, AuthCredentials)>> {
    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        user: User,
        password_hash: String,
    }

    let row = sqlx::query_as::<_, Row>(
        r#"
        SELECT u.*, ac.password_hash
        FROM users u
        JOIN auth_credentials ac ON u.id = ac.user_id
        WHERE u.email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|record| {
        let credentials = AuthCredentials {
            user_id: record.user.id,
            password_hash: record.password_hash,
        };
        (record.user, credentials)
    }))
}
