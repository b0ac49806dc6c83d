use actix_web::web::{self};

pub mod routes {
    pub mod billing;
}

mod services {
    pub(crate) mod billing;
}

mod dtos {
    pub(crate) mod billing;
}

mod models {
    pub(crate) mod plan;
}

pub fn mount_billing() -> actix_web::Scope {
    web::scope("/billing")
        .service(routes::billing::get_overview)
        .service(routes::billing::get_plans)
}
