use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::auth::{AuthenticatedUser, Claims, UserType},
};

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".into()))?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| anyhow::anyhow!("JWT secret not configured"))?;

        decode_token(token, &secret.0)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
    }
}

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

pub fn encode_token(
    user_id: Uuid,
    user_type: UserType,
    secret: &str,
    ttl_seconds: u64,
) -> anyhow::Result<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        user_type,
        iat: now,
        exp: now + ttl_seconds as usize,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_token(token: &str, secret: &str) -> anyhow::Result<AuthenticatedUser> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AuthenticatedUser {
        user_id: claims.sub.parse()?,
        user_type: claims.user_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_account_and_type() {
        let id = Uuid::new_v4();
        let token = encode_token(id, UserType::Child, "secret", 60).unwrap();

        let user = decode_token(&token, "secret").unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.user_type, UserType::Child);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = encode_token(Uuid::new_v4(), UserType::Parent, "secret", 60).unwrap();
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            user_type: UserType::Parent,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(decode_token(&token, "secret").is_err());
    }
}
