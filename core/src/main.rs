mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;
use currency::RateCache;
use mailer::{InvoiceMailer, SmtpMailer};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origins: Vec<String> = cors::allowed_origins(&config.cors_allowed_origin)
        .into_iter()
        .map(str::to_string)
        .collect();
    let cookie_secure = !origins.iter().any(|o| o.contains("localhost"));

    // init logger
    if config.console_logging_enabled {
        logger::setup(is_production).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");

    // shared across workers
    let rates = Arc::new(RateCache::new(&config.currency).expect("Failed to build rate client"));
    let mailer: Arc<dyn InvoiceMailer> = Arc::new(SmtpMailer::new(config.smtp.clone()));
    // 50 req/s overall, 10 per client, across all workers
    let request_limiter = limiter::middleware(50, 10);

    if config.smtp.host.is_empty() {
        log::warn!("SMTP_HOST is not set; only users with a custom relay can send email");
    }
    if config.cron_secret.is_none() {
        log::warn!("CRON_SECRET is not set; the cron endpoint is open");
    }

    log::info!(
        "Starting PayTrack on {}:{}",
        config.server_host,
        config.server_port
    );

    HttpServer::new(move || {
        let secret = config_data.jwt_config.secret.as_bytes();
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(rates.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .wrap(request_limiter.clone()) // 5th
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 4th
            .wrap(extractor::middleware()) // 3rd
            .wrap(cors::middleware(&origins)) // 2nd
            .wrap(api_auth::session_middleware(
                cookie_secure,
                is_production,
                secret,
            )) // 1st
            .service(
                web::scope("/api")
                    .service(api_auth::mount_auth())
                    .service(cron::mount_cron())
                    .service(
                        web::scope("/dashboard")
                            .wrap(api_auth::auth_middleware())
                            .service(api_auth::mount_user())
                            .service(api_clients::mount_clients())
                            .service(api_invoices::mount_invoices())
                            .service(api_settings::mount_settings())
                            .service(api_billing::mount_billing())
                            .service(currency::mount_currency()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
