use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::jwt::get_jwt_claims_or_error;
use futures::future::{Ready, ok};

/// Guards a scope: requests without valid claims (placed by the extractor
/// middleware) get 401, the rest see `web::ReqData<JwtClaims>`.
pub struct AuthMiddleware {}

impl AuthMiddleware {
    pub fn new() -> Self {
        AuthMiddleware {}
    }
}

impl Default for AuthMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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

        Box::pin(async move {
            match get_jwt_claims_or_error(&req) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(response) => Ok(req.into_response(response.map_into_boxed_body())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, HttpResponse, http::StatusCode, test, web};
    use common::{
        env_config::Config,
        jwt::{TokenSubject, JwtClaims, generate_jwt},
    };
    use uuid::Uuid;

    use super::*;

    async fn protected(claims: web::ReqData<JwtClaims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.email.clone())
    }

    macro_rules! app {
        ($config:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($config))
                    .wrap(extractor::middleware())
                    .service(
                        web::scope("/api/dashboard")
                            .wrap(AuthMiddleware::new())
                            .route("/ping", web::get().to(protected)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn request_without_token_is_unauthorized() {
        let app = app!(Arc::new(Config::for_tests()));
        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/dashboard/ping").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn request_with_invalid_token_is_unauthorized() {
        let app = app!(Arc::new(Config::for_tests()));
        let req = test::TestRequest::get()
            .uri("/api/dashboard/ping")
            .insert_header(("Authorization", "Bearer forged"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_token_exposes_claims_to_handlers() {
        let config = Arc::new(Config::for_tests());
        let token = generate_jwt(
            TokenSubject {
                user_id: Uuid::new_v4(),
                email: "owner@example.com".to_string(),
            },
            &config.jwt_config,
        )
        .unwrap();
        let app = app!(config);

        let req = test::TestRequest::get()
            .uri("/api/dashboard/ping")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"owner@example.com");
    }
}
