use uuid::Uuid;

pub struct UserSmtpUpsertRequest {
    pub user_id: Uuid,
    pub host: String,
    pub port: i32,
    pub username: String,
    /// `None` keeps the stored password
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub secure: bool,
    pub use_custom: bool,
}
