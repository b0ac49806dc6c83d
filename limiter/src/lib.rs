use middleware::requests::RequestLimiter;

pub mod middleware {
    pub mod requests;
}

pub fn middleware(server_per_sec: u32, client_per_sec: u32) -> RequestLimiter {
    RequestLimiter::new(server_per_sec, client_per_sec)
}
