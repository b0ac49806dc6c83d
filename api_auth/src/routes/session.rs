use actix_session::Session;
use actix_web::{Responder, get};
use common::error::{AppError, Res};
use common::http::Success;
use db::models::user::User;
use serde_json::json;

/// Returns the token and user stored in the cookie session by sign-in.
///
/// # Output
/// - Success: `{ token, user }`
/// - Error: 401 Unauthorized if no session exists
#[get("/session")]
async fn get_session(session: Session) -> Res<impl Responder> {
    let user = session
        .get::<User>("user")
        .map_err(|_| AppError::BadRequest("Session user error".to_string()))?
        .ok_or_else(|| AppError::Unauthorized("No user data found".to_string()))?;
    let token = session
        .get::<String>("token")
        .map_err(|_| AppError::BadRequest("Session token error".to_string()))?
        .ok_or_else(|| AppError::Unauthorized("No session token found".to_string()))?;

    Success::ok(json!({
        "token": token,
        "user": user,
    }))
}
