use std::sync::Arc;

use actix_web::{Responder, get, web};
use common::{env_config::Config, error::Res, http::Success};

use crate::{
    dtos::currency::{ConvertQuery, ConvertResponse, RatesQuery},
    services::rates::RateCache,
};

/// Rate table for `base`, or for the currency invoices are stored in.
#[get("/rates")]
pub async fn get_rates(
    config: web::Data<Arc<Config>>,
    cache: web::Data<Arc<RateCache>>,
    query: web::Query<RatesQuery>,
) -> Res<impl Responder> {
    let base = query
        .base
        .as_deref()
        .unwrap_or(&config.currency.default_currency);
    let table = cache.rates(base).await?;
    Success::ok(table)
}

#[get("/convert")]
pub async fn get_convert(
    cache: web::Data<Arc<RateCache>>,
    query: web::Query<ConvertQuery>,
) -> Res<impl Responder> {
    let query = query.into_inner();
    let table = cache.rates(&query.from).await?;
    let rate = table.convert(1.0, &query.from, &query.to)?;

    Success::ok(ConvertResponse {
        amount: query.amount,
        from: query.from.to_uppercase(),
        to: query.to.to_uppercase(),
        rate,
        result: query.amount * rate,
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use common::env_config::CurrencyConfig;

    use super::*;

    macro_rules! app {
        () => {{
            let cache = RateCache::new(&CurrencyConfig {
                api_url: "http://127.0.0.1:1".to_string(),
                ..CurrencyConfig::default()
            })
            .unwrap();
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Arc::new(Config::for_tests())))
                    .app_data(web::Data::new(Arc::new(cache)))
                    .service(crate::mount_currency()),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn convert_uses_the_fallback_rates_offline() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/currency/convert?amount=100&from=usd&to=EUR")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["from"], "USD");
        assert_eq!(body["to"], "EUR");
        assert!((body["result"].as_f64().unwrap() - 92.0).abs() < 1e-9);
    }

    #[actix_web::test]
    async fn unknown_currency_is_rejected() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/currency/convert?amount=1&from=USD&to=XYZ")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn rates_default_to_the_storage_currency() {
        let app = app!();
        let req = test::TestRequest::get().uri("/currency/rates").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["base"], "USD");
        assert_eq!(body["source"], "fallback");
    }
}
