use std::env;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Account;
use crate::state::AppState;

const TOKEN_VALIDITY_DAYS: i64 = 7;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl AuthConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::BadRequest("JWT_SECRET is not set".to_string()))?;
        Ok(Self { jwt_secret })
    }
}

/// Identity claims embedded in every bearer token. Identity-bearing fields
/// (full name, avatar) go stale after a profile update, so mutations that
/// touch them must re-issue a token via [`sign_token`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: i64,
    pub user_name: String,
    pub full_name: String,
    pub role: String,
    pub avatar: Option<String>,
    pub exp: usize,
}

pub fn sign_token(config: &AuthConfig, account: &Account) -> Result<String, AppError> {
    let claims = Claims {
        sub: account.id,
        user_name: account.user_name.clone(),
        full_name: account.full_name.clone(),
        role: account.role.clone(),
        avatar: account.avatar.clone(),
        exp: (Utc::now() + chrono::Duration::days(TOKEN_VALIDITY_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|_| AppError::InternalServerError)
}

pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Extract and validate the bearer token, then require the "user" role.
/// Valid claims are stored in request extensions for the handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(&state.auth, token)?;
    if claims.role != "user" {
        return Err(AppError::Unauthorized);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> Account {
        Account {
            id: 7,
            user_name: "dum".to_string(),
            password: "$2b$10$hash".to_string(),
            full_name: "Dum Nguyen".to_string(),
            email: "dum@example.com".to_string(),
            phone_number: "0123456789".to_string(),
            avatar: None,
            role: "user".to_string(),
            status: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
        };

        let token = sign_token(&config, &test_account()).expect("Failed to sign token");
        let claims = verify_token(&config, &token).expect("Failed to verify token");

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.user_name, "dum");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
        };
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
        };

        let token = sign_token(&config, &test_account()).expect("Failed to sign token");
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
        };

        let claims = Claims {
            sub: 7,
            user_name: "dum".to_string(),
            full_name: "Dum Nguyen".to_string(),
            role: "user".to_string(),
            avatar: None,
            exp: (Utc::now() - chrono::Duration::days(8)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .expect("Failed to encode");

        assert!(verify_token(&config, &token).is_err());
    }
}
