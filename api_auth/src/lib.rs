use actix_session::{SessionMiddleware, config::PersistentSession, storage::CookieSessionStore};
use actix_web::{
    cookie::{Key, SameSite, time::Duration},
    web,
};
use middleware::auth::AuthMiddleware;

pub mod routes {
    pub mod auth;
    pub mod session;
    pub mod user;
}
pub mod middleware {
    pub mod auth;
}

mod services {
    pub(crate) mod auth;
    pub(crate) mod user;
}
mod dtos {
    pub(crate) mod auth;
}

pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_signup)
        .service(routes::auth::post_signin)
        .service(routes::auth::post_signout)
        .service(routes::session::get_session)
}
pub fn mount_user() -> actix_web::Scope {
    web::scope("/user").service(routes::user::get_me)
}

/// Rejects requests that carry no valid token.
pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new()
}

/// Signed cookie session holding the sign-in token.
pub fn session_middleware(
    cookie_secure: bool,
    is_production: bool,
    secret: &[u8],
) -> SessionMiddleware<CookieSessionStore> {
    let same_site = if is_production {
        SameSite::Strict
    } else {
        SameSite::Lax
    };
    SessionMiddleware::builder(CookieSessionStore::default(), Key::derive_from(secret))
        .cookie_name("paytrack_session".to_string())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(same_site)
        .session_lifecycle(PersistentSession::default().session_ttl(Duration::days(1)))
        .build()
}
