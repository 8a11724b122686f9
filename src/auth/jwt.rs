use crate::core::errors::ExpenseError;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub exp: usize, // Expiration timestamp
}

pub struct JwtService {
    secret: String,
    ttl_secs: u64,
}

impl JwtService {
    pub fn new(secret: String) -> Self {
        JwtService {
            secret,
            ttl_secs: 24 * 3600,
        }
    }

    pub fn with_ttl_hours(mut self, hours: u64) -> Self {
        self.ttl_secs = hours * 3600;
        self
    }

    pub fn generate_token(&self, user_id: &str, username: &str) -> Result<String, ExpenseError> {
        let expiration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| (d.as_secs() + self.ttl_secs) as usize)
            .map_err(|e| ExpenseError::InternalServerError(format!("Time error: {}", e)))?;

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ExpenseError::InternalServerError(format!("JWT encoding error: {}", e)))
    }

    /// Accepts the token with or without its `Bearer ` prefix.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ExpenseError> {
        let token = bearer_token(token).ok_or_else(|| ExpenseError::InvalidToken("token is empty".to_string()))?;
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ExpenseError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

/// Strips an optional `Bearer` scheme from an `Authorization` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let value = header_value.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}
