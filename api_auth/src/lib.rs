use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite, time::Duration};
use middleware::auth::AuthMiddleware;

pub mod middleware {
    pub mod auth;
}

/// Name of the cookie holding the signed-in session.
pub const SESSION_COOKIE_NAME: &str = "membership_session";

// Session middleware
pub fn session_middleware(
    cookie_secure: bool,
    is_production: bool,
    secret: &[u8],
) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(secret))
        .cookie_name(SESSION_COOKIE_NAME.to_string())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(if is_production {
            SameSite::Strict
        } else {
            SameSite::Lax
        })
        .cookie_content_security(CookieContentSecurity::Private)
        .session_lifecycle(PersistentSession::default().session_ttl(Duration::days(7)))
        .build()
}

// Auth middleware, unauthenticated requests are sent to `login_path`
pub fn require_user(login_path: &str) -> AuthMiddleware {
    AuthMiddleware::new(login_path.to_string())
}
