use std::{future::Future, pin::Pin, sync::Arc};

use actix_session::SessionExt;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use futures::future::{Ready, ok};

use common::{
    env_config::Config,
    error::Res,
    jwt::{self, JwtClaims},
};

/// Validates the caller's token and stores the outcome as `Res<JwtClaims>`
/// in the request extensions. The token comes from the `Authorization`
/// bearer header, or from the cookie session when the header is absent.
pub struct ExtractionMiddleware {}

impl ExtractionMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ExtractionMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for ExtractionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ExtractionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ExtractionMiddlewareService {
            service: Arc::new(service),
        })
    }
}

pub struct ExtractionMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for ExtractionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // retrieve token from authorization header
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
            .map(|token| token.to_owned());
        // fall back to the token stored by sign-in
        let token = bearer.or_else(|| req.get_session().get::<String>("token").ok().flatten());

        let secret = req
            .app_data::<web::Data<Arc<Config>>>()
            .map(|config| config.jwt_config.secret.clone());
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            match (token, secret) {
                (Some(token), Some(secret)) => {
                    // validate token and insert claims to request object for future use
                    let claims_res = jwt::validate_jwt(&token, &secret);
                    req.extensions_mut().insert::<Res<JwtClaims>>(claims_res);
                }
                (Some(_), None) => log::warn!("Config missing from app data, token ignored"),
                _ => {}
            }
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpRequest, HttpResponse, test, web};
    use common::jwt::{TokenSubject, generate_jwt};
    use uuid::Uuid;

    use super::*;

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match req.extensions().get::<Res<JwtClaims>>() {
            Some(Ok(claims)) => HttpResponse::Ok().body(claims.user_id.to_string()),
            Some(Err(_)) => HttpResponse::Unauthorized().finish(),
            None => HttpResponse::NoContent().finish(),
        }
    }

    fn config() -> Arc<Config> {
        Arc::new(Config::for_tests())
    }

    #[actix_web::test]
    async fn bearer_token_claims_reach_the_handler() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = generate_jwt(
            TokenSubject {
                user_id,
                email: "a@b.co".to_string(),
            },
            &config.jwt_config,
        )
        .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .wrap(ExtractionMiddleware::new())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], user_id.to_string().as_bytes());
    }

    #[actix_web::test]
    async fn garbage_token_is_recorded_as_an_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config()))
                .wrap(ExtractionMiddleware::new())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn anonymous_request_passes_through_untouched() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config()))
                .wrap(ExtractionMiddleware::new())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::NO_CONTENT);
    }
}
