use actix_web::web;

pub mod routes {
    pub mod document;
    pub mod email;
    pub mod invoice;
}
pub mod services {
    pub mod email;
    pub mod invoice;
    pub mod stats;
}
pub mod dtos {
    pub mod invoice;
}
pub mod misc {
    pub mod document;
}

/// `/stats` is registered ahead of `/{id}` so it is not taken for an id.
pub fn mount_invoices() -> actix_web::Scope {
    web::scope("/invoice")
        .service(routes::invoice::post_invoice)
        .service(routes::invoice::get_invoices)
        .service(routes::invoice::get_stats)
        .service(routes::invoice::get_invoice)
        .service(routes::invoice::post_mark_paid)
        .service(routes::email::post_send)
        .service(routes::email::post_schedule)
        .service(routes::document::get_document)
}
