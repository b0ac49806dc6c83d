use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserSmtp {
    pub user_id: Uuid,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub secure: bool,
    pub use_custom: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
