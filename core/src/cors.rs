use actix_cors::Cors;
use actix_web::http::{Method, header};

/// `CORS_ALLOWED_ORIGIN` may list several origins separated by commas,
/// e.g. the dashboard and a marketing site.
pub fn allowed_origins(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .collect()
}

pub fn middleware(origins: &[String]) -> Cors {
    let cors = origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));

    cors.allowed_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600)
}
