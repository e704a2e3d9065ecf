use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_session::SessionExt;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use common::{
    error::Res,
    jwt::{self, JwtClaims},
};

/// Session key under which the auth service stores the session token.
pub const SESSION_TOKEN_KEY: &str = "token";

pub struct ExtractionMiddleware {
    secret: Rc<String>,
}

impl ExtractionMiddleware {
    pub fn new(secret: String) -> Self {
        Self {
            secret: Rc::new(secret),
        }
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
            secret: self.secret.clone(),
        })
    }
}

pub struct ExtractionMiddlewareService<S> {
    service: Arc<S>,
    secret: Rc<String>,
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
        // bearer header first, then the cookie session
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
            .map(str::to_owned)
            .or_else(|| {
                req.get_session()
                    .get::<String>(SESSION_TOKEN_KEY)
                    .unwrap_or_else(|e| {
                        log::debug!("Unreadable session token: {}", e);
                        None
                    })
            });

        let secret = self.secret.clone();
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            if let Some(token) = token {
                // validate token and insert claims to request object for future use
                let claims_res = jwt::validate_jwt(&token, &secret);
                req.extensions_mut().insert::<Res<JwtClaims>>(claims_res);
            }
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_session::{Session, SessionMiddleware, storage::CookieSessionStore};
    use actix_web::{App, HttpRequest, HttpResponse, cookie::Key, test, web};
    use common::jwt::generate_jwt;
    use uuid::Uuid;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn token(user_id: Uuid) -> String {
        generate_jwt(user_id, SECRET, 1).unwrap()
    }

    async fn sign_in(session: Session, user_id: web::Path<Uuid>) -> HttpResponse {
        session
            .insert(SESSION_TOKEN_KEY, token(user_id.into_inner()))
            .unwrap();
        HttpResponse::Ok().finish()
    }

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match req.extensions().get::<Res<JwtClaims>>() {
            Some(Ok(claims)) => HttpResponse::Ok().body(claims.user_id.to_string()),
            Some(Err(_)) => HttpResponse::Unauthorized().finish(),
            None => HttpResponse::NoContent().finish(),
        }
    }

    macro_rules! extractor_app {
        () => {
            test::init_service(
                App::new()
                    .wrap(ExtractionMiddleware::new(SECRET.to_string()))
                    .wrap(
                        SessionMiddleware::builder(
                            CookieSessionStore::default(),
                            Key::from(SECRET.as_bytes()),
                        )
                        .cookie_secure(false)
                        .build(),
                    )
                    .route("/sign-in/{user_id}", web::post().to(sign_in))
                    .route("/whoami", web::get().to(whoami)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn no_token_leaves_request_untouched() {
        let app = extractor_app!();

        let res = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;

        assert_eq!(res.status(), actix_web::http::StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn bearer_token_is_verified() {
        let app = extractor_app!();
        let user_id = Uuid::new_v4();

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token(user_id))))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(test::read_body(res).await, user_id.to_string());

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer not-a-token"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn session_cookie_token_is_verified() {
        let app = extractor_app!();
        let user_id = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri(&format!("/sign-in/{}", user_id))
            .to_request();
        let res = test::call_service(&app, req).await;
        let cookie = res
            .response()
            .cookies()
            .next()
            .expect("session cookie")
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/whoami")
            .cookie(cookie)
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(test::read_body(res).await, user_id.to_string());
    }
}
