use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::error::AppError;
use governor::{DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{
    future::Future,
    net::{IpAddr, Ipv4Addr},
    num::NonZeroU32,
    pin::Pin,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Idle client buckets are dropped every this many requests.
const PRUNE_EVERY: u64 = 1024;

fn per_second(permits: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(permits).unwrap_or(NonZeroU32::MIN))
}

struct Limits {
    server: DefaultDirectRateLimiter,
    per_client: DefaultKeyedRateLimiter<IpAddr>,
    seen: AtomicU64,
}

impl Limits {
    /// Counts the request and forgets clients whose bucket is full again.
    fn tick(&self) {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % PRUNE_EVERY == 0 {
            self.per_client.retain_recent();
            self.per_client.shrink_to_fit();
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.per_client.len()
    }
}

/// Two buckets: one for the whole server and one per client address.
/// A request must fit in both.
///
/// Build it once and clone it into the `HttpServer` factory: clones share
/// the buckets, so the limits hold across workers.
#[derive(Clone)]
pub struct RequestLimiter {
    limits: Arc<Limits>,
}

impl RequestLimiter {
    pub fn new(server_per_sec: u32, client_per_sec: u32) -> Self {
        RequestLimiter {
            limits: Arc::new(Limits {
                server: RateLimiter::direct(per_second(server_per_sec)),
                per_client: RateLimiter::keyed(per_second(client_per_sec)),
                seen: AtomicU64::new(0),
            }),
        }
    }
}

/// Requests without a peer address share one bucket.
fn client_ip(req: &ServiceRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

impl<S, B> Transform<S, ServiceRequest> for RequestLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = RequestLimiterService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLimiterService {
            service: Rc::new(service),
            limits: Arc::clone(&self.limits),
        }))
    }
}

pub struct RequestLimiterService<S> {
    service: Rc<S>,
    limits: Arc<Limits>,
}

impl<S, B> Service<ServiceRequest> for RequestLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let limits = Arc::clone(&self.limits);
        Box::pin(async move {
            limits.tick();
            let ip = client_ip(&req);
            let rejection = if limits.per_client.check_key(&ip).is_err() {
                log::warn!("Client {} over its rate limit on {}", ip, req.path());
                Some("Too many requests. Please slow down.")
            } else if limits.server.check().is_err() {
                log::warn!("Server rate limit hit on {}", req.path());
                Some("Server overloaded. Please try again later.")
            } else {
                None
            };

            match rejection {
                None => srv.call(req).await.map(|res| res.map_into_boxed_body()),
                Some(message) => {
                    Ok(req.error_response(AppError::TooManyRequests(message.to_string())))
                }
            }
        })
    }
}
