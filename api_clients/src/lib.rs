use actix_web::web;

pub mod routes {
    pub mod client;
}
pub mod services {
    pub mod client;
}
pub mod dtos {
    pub mod client;
}

pub fn mount_clients() -> actix_web::Scope {
    web::scope("/client")
        .service(routes::client::post_client)
        .service(routes::client::get_clients)
        .service(routes::client::get_client)
}
