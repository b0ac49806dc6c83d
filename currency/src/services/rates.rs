use std::{collections::HashMap, time::Duration};

use chrono::{NaiveDateTime, Utc};
use common::{
    env_config::CurrencyConfig,
    error::{AppError, Res},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// USD-relative rates used when the rate API is unreachable and nothing is cached.
const FALLBACK_USD_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 149.5),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("CHF", 0.88),
    ("CNY", 7.24),
    ("INR", 83.1),
    ("MXN", 17.1),
    ("BRL", 4.97),
    ("ZAR", 18.6),
    ("NGN", 1550.0),
    ("SEK", 10.4),
    ("NZD", 1.64),
    ("SGD", 1.34),
];

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a failed refresh keeps the API from being asked again for that base.
const RETRY_AFTER_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Live,
    /// Expired cache entry served because a refresh failed.
    Stale,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateTable {
    pub base: String,
    /// Units of each currency per one unit of `base`.
    pub rates: HashMap<String, f64>,
    pub fetched_at: NaiveDateTime,
    pub source: RateSource,
}

impl RateTable {
    pub fn rate(&self, code: &str) -> Res<f64> {
        let code = code.trim().to_uppercase();
        if code == self.base {
            return Ok(1.0);
        }
        self.rates
            .get(&code)
            .copied()
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| AppError::BadRequest(format!("Unsupported currency: {}", code)))
    }

    /// `amount / rate[from] * rate[to]`
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Res<f64> {
        Ok(amount / self.rate(from)? * self.rate(to)?)
    }
}

/// Builds the hardcoded table, rebased onto `base`.
pub fn fallback_table(base: &str) -> Res<RateTable> {
    let base = normalize_code(base)?;
    let usd: HashMap<String, f64> = FALLBACK_USD_RATES
        .iter()
        .map(|(code, rate)| (code.to_string(), *rate))
        .collect();
    let base_rate = usd
        .get(&base)
        .copied()
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported currency: {}", base)))?;

    Ok(RateTable {
        rates: usd
            .into_iter()
            .map(|(code, rate)| (code, rate / base_rate))
            .collect(),
        base,
        fetched_at: Utc::now().naive_utc(),
        source: RateSource::Fallback,
    })
}

fn normalize_code(code: &str) -> Res<String> {
    let code = code.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(AppError::BadRequest(format!("Invalid currency code: {}", code)))
    }
}

#[derive(Deserialize)]
struct RateApiResponse {
    rates: HashMap<String, f64>,
}

/// Exchange rates per base currency, refreshed from the rate API once the
/// cached table is older than the TTL. Shared by all workers.
pub struct RateCache {
    client: reqwest::Client,
    api_url: String,
    ttl: chrono::Duration,
    tables: DashMap<String, RateTable>,
    /// Last failed fetch per base.
    failures: DashMap<String, NaiveDateTime>,
}

impl RateCache {
    pub fn new(config: &CurrencyConfig) -> Res<Self> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(RateCache {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            ttl: chrono::Duration::seconds(config.ttl_secs),
            tables: DashMap::new(),
            failures: DashMap::new(),
        })
    }

    /// Fresh cache, then the rate API, then the stale cache, then the fallback table.
    /// After a failed refresh the API is left alone for a minute.
    pub async fn rates(&self, base: &str) -> Res<RateTable> {
        let base = normalize_code(base)?;
        let now = Utc::now().naive_utc();
        let cached = self.tables.get(&base).map(|entry| entry.clone());

        if let Some(table) = &cached {
            if now - table.fetched_at < self.ttl {
                return Ok(table.clone());
            }
        }

        let backing_off = self
            .failures
            .get(&base)
            .is_some_and(|failed_at| now - *failed_at < chrono::Duration::seconds(RETRY_AFTER_SECS));
        if backing_off {
            return Self::offline(&base, cached);
        }

        match self.fetch(&base).await {
            Ok(table) => {
                self.failures.remove(&base);
                self.tables.insert(base, table.clone());
                Ok(table)
            }
            Err(e) => {
                log::warn!("Exchange rate refresh for {} failed: {}", base, e);
                self.failures.insert(base.clone(), now);
                Self::offline(&base, cached)
            }
        }
    }

    /// What to serve while the rate API is unavailable.
    fn offline(base: &str, cached: Option<RateTable>) -> Res<RateTable> {
        match cached {
            Some(mut table) => {
                table.source = RateSource::Stale;
                Ok(table)
            }
            None => fallback_table(base),
        }
    }

    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Res<f64> {
        self.rates(from).await?.convert(amount, from, to)
    }

    async fn fetch(&self, base: &str) -> Res<RateTable> {
        let url = format!("{}/{}", self.api_url, base);
        let body: RateApiResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut rates: HashMap<String, f64> = body
            .rates
            .into_iter()
            .map(|(code, rate)| (code.to_uppercase(), rate))
            .collect();
        rates.insert(base.to_string(), 1.0);
        log::info!("Fetched {} exchange rates for {}", rates.len(), base);

        Ok(RateTable {
            base: base.to_string(),
            rates,
            fetched_at: Utc::now().naive_utc(),
            source: RateSource::Live,
        })
    }

    #[cfg(test)]
    fn seed(&self, table: RateTable) {
        self.tables.insert(table.base.clone(), table);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::TcpListener,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use super::*;

    /// Rate API that accepts connections and hangs up at once. Returns its URL
    /// and the number of connections seen.
    fn dropping_api() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });
        (url, hits)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn unreachable_cache() -> RateCache {
        RateCache::new(&CurrencyConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            ttl_secs: 3600,
            default_currency: "USD".to_string(),
        })
        .unwrap()
    }

    fn table(base: &str, rates: &[(&str, f64)], fetched_at: NaiveDateTime) -> RateTable {
        RateTable {
            base: base.to_string(),
            rates: rates.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
            fetched_at,
            source: RateSource::Live,
        }
    }

    #[test]
    fn conversion_goes_through_the_table_base() {
        let t = table("USD", &[("USD", 1.0), ("EUR", 0.5), ("GBP", 0.25)], Utc::now().naive_utc());
        assert!(approx(t.convert(10.0, "USD", "EUR").unwrap(), 5.0));
        assert!(approx(t.convert(10.0, "EUR", "GBP").unwrap(), 5.0));
        assert!(approx(t.convert(10.0, "eur", "usd").unwrap(), 20.0));
    }

    #[test]
    fn converting_there_and_back_returns_the_original_amount() {
        let t = fallback_table("USD").unwrap();
        let there = t.convert(1234.56, "USD", "JPY").unwrap();
        let back = t.convert(there, "JPY", "USD").unwrap();
        assert!((back - 1234.56).abs() < 1e-6);
    }

    #[test]
    fn unknown_currency_is_a_bad_request() {
        let t = fallback_table("USD").unwrap();
        assert!(matches!(t.convert(1.0, "USD", "XYZ"), Err(AppError::BadRequest(_))));
        assert!(matches!(fallback_table("XYZ"), Err(AppError::BadRequest(_))));
        assert!(matches!(fallback_table("dollars"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn fallback_table_is_rebased() {
        let t = fallback_table("eur").unwrap();
        assert_eq!(t.base, "EUR");
        assert!(approx(t.rate("EUR").unwrap(), 1.0));
        assert!(approx(t.rate("USD").unwrap(), 1.0 / 0.92));
        assert_eq!(t.source, RateSource::Fallback);
    }

    #[actix_web::test]
    async fn unreachable_api_without_cache_serves_the_fallback() {
        let cache = unreachable_cache();
        let t = cache.rates("USD").await.unwrap();
        assert_eq!(t.source, RateSource::Fallback);
        assert!(approx(t.rate("EUR").unwrap(), 0.92));
    }

    #[actix_web::test]
    async fn fresh_cache_is_served_without_fetching() {
        let cache = unreachable_cache();
        cache.seed(table("USD", &[("USD", 1.0), ("EUR", 0.5)], Utc::now().naive_utc()));
        let t = cache.rates("usd").await.unwrap();
        assert_eq!(t.source, RateSource::Live);
        assert!(approx(cache.convert(10.0, "USD", "EUR").await.unwrap(), 5.0));
    }

    #[actix_web::test]
    async fn expired_cache_is_served_stale_when_refresh_fails() {
        let cache = unreachable_cache();
        let old = Utc::now().naive_utc() - chrono::Duration::hours(2);
        cache.seed(table("USD", &[("USD", 1.0), ("EUR", 0.5)], old));
        let t = cache.rates("USD").await.unwrap();
        assert_eq!(t.source, RateSource::Stale);
        assert!(approx(t.rate("EUR").unwrap(), 0.5));
    }

    #[actix_web::test]
    async fn failed_refresh_is_not_retried_on_every_lookup() {
        let (api_url, hits) = dropping_api();
        let cache = RateCache::new(&CurrencyConfig {
            api_url,
            ttl_secs: 3600,
            default_currency: "USD".to_string(),
        })
        .unwrap();

        for _ in 0..3 {
            let t = cache.rates("USD").await.unwrap();
            assert_eq!(t.source, RateSource::Fallback);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn refresh_is_attempted_again_once_the_backoff_passes() {
        let (api_url, hits) = dropping_api();
        let cache = RateCache::new(&CurrencyConfig {
            api_url,
            ttl_secs: 3600,
            default_currency: "USD".to_string(),
        })
        .unwrap();

        cache.rates("USD").await.unwrap();
        cache.failures.insert(
            "USD".to_string(),
            Utc::now().naive_utc() - chrono::Duration::seconds(RETRY_AFTER_SECS + 1),
        );
        cache.rates("USD").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
