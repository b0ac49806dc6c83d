use actix_web::web;

pub mod routes {
    pub mod smtp;
}
pub mod services {
    pub mod smtp;
}
pub mod dtos {
    pub mod smtp;
}

pub fn mount_settings() -> actix_web::Scope {
    web::scope("/settings")
        .service(routes::smtp::put_smtp)
        .service(routes::smtp::get_smtp)
        .service(routes::smtp::delete_smtp)
}
