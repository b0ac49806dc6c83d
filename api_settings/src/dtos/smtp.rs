use chrono::NaiveDateTime;
use db::models::smtp::UserSmtp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SaveSmtpRequest {
    pub host: String,
    pub port: Option<i32>,
    pub username: String,
    /// Empty or absent keeps the stored password.
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub secure: bool,
    pub use_custom: bool,
}

/// Stored settings as returned to the owner. The password never leaves the server.
#[derive(Debug, Serialize)]
pub struct SmtpSettingsView {
    pub host: String,
    pub port: i32,
    pub username: String,
    pub has_password: bool,
    pub from_email: String,
    pub from_name: String,
    pub secure: bool,
    pub use_custom: bool,
    pub updated_at: NaiveDateTime,
}

impl From<UserSmtp> for SmtpSettingsView {
    fn from(settings: UserSmtp) -> Self {
        SmtpSettingsView {
            has_password: !settings.password.is_empty(),
            host: settings.host,
            port: settings.port,
            username: settings.username,
            from_email: settings.from_email,
            from_name: settings.from_name,
            secure: settings.secure,
            use_custom: settings.use_custom,
            updated_at: settings.updated_at,
        }
    }
}
