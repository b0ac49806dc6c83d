use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::client::ClientCreateRequest,
    models::client::{Client, ClientWithCount},
};

pub async fn insert_client<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: ClientCreateRequest,
) -> Res<Client> {
    sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (user_id, name, email)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.name)
    .bind(data.email)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_clients_with_counts<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<ClientWithCount>> {
    sqlx::query_as::<_, ClientWithCount>(
        r#"
        SELECT c.*, COUNT(i.id) AS invoice_count
        FROM clients c
        LEFT JOIN invoices i ON i.client_id = c.id
        WHERE c.user_id = $1
        GROUP BY c.id
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Fetches a client only when it belongs to `user_id`.
pub async fn get_client_for_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    client_id: Uuid,
) -> Res<Option<Client>> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1 AND user_id = $2")
        .bind(client_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}
