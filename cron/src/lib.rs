use actix_web::web;

pub mod routes {
    pub mod scheduled;
}
pub mod services {
    pub mod dispatch;
}

/// Endpoints hit by an external scheduler. Not behind user auth.
pub fn mount_cron() -> actix_web::Scope {
    web::scope("/cron").service(routes::scheduled::get_send_scheduled_emails)
}
