use actix_web::{HttpMessage, dev::ServiceRequest};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Res};

/// Claims of the session token issued by the auth service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub exp: usize,
}

/// Generates a session token for `user_id`, valid for `expiration_hours`.
/// Tokens are issued by the auth service, this is for tests only.
#[cfg(any(test, feature = "test-support"))]
pub fn generate_jwt(user_id: Uuid, secret: &str, expiration_hours: i64) -> Res<String> {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header};

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(expiration_hours))
        .ok_or_else(|| AppError::Internal("Token expiration out of range".to_string()))?
        .timestamp();

    let claims = JwtClaims {
        user_id,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from a session token.
/// Requires the session secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Returns the claims the extraction middleware left on the request.
pub fn get_jwt_claims_or_error(req: &ServiceRequest) -> Res<JwtClaims> {
    match req.extensions().get::<Res<JwtClaims>>() {
        Some(Ok(claims)) => Ok(claims.clone()),
        Some(Err(e)) => Err(AppError::Unauthorized(e.to_string())),
        None => Err(AppError::Unauthorized(
            "No session token provided".to_string(),
        )),
    }
}
