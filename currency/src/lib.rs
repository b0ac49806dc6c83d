use actix_web::web;

pub mod routes {
    pub mod currency;
}
pub mod services {
    pub mod rates;
}
pub mod dtos {
    pub mod currency;
}

pub use services::rates::{RateCache, RateSource, RateTable};

pub fn mount_currency() -> actix_web::Scope {
    web::scope("/currency")
        .service(routes::currency::get_rates)
        .service(routes::currency::get_convert)
}
