//! JWT service for token generation and validation
//!
//! Access and refresh tokens are HS256 tokens signed with separate secrets.
//! Both carry only the user id; nothing is stored server-side.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_token_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_token_secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    access: Keys,
    refresh: Keys,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.access_token_secret.is_empty() || config.refresh_token_secret.is_empty() {
            return Err(anyhow::anyhow!("Token secrets must not be empty"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(JwtService {
            access: Keys::from_secret(&config.access_token_secret),
            refresh: Keys::from_secret(&config.refresh_token_secret),
            validation,
            config,
        })
    }

    fn issue(&self, user_id: Uuid, token_type: TokenType) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let (keys, expiry) = match token_type {
            TokenType::Access => (&self.access, self.config.access_token_expiry),
            TokenType::Refresh => (&self.refresh, self.config.refresh_token_expiry),
        };

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + expiry,
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?;
        Ok(token)
    }

    fn validate(&self, token: &str, token_type: TokenType) -> Result<Claims> {
        let keys = match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        };

        let claims = decode::<Claims>(token, &keys.decoding, &self.validation)?.claims;
        if claims.token_type != token_type {
            return Err(anyhow::anyhow!("Expected a {:?} token", token_type));
        }
        Ok(claims)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, TokenType::Access)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, TokenType::Refresh)
    }

    /// Validate an access token and return the claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        self.validate(token, TokenType::Access)
    }

    /// Validate a refresh token and return the claims
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims> {
        self.validate(token, TokenType::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604_800,
        })
        .unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let jwt = service();
        let user_id = Uuid::new_v4();

        let token = jwt.generate_access_token(user_id).unwrap();
        let claims = jwt.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let jwt = service();
        let user_id = Uuid::new_v4();

        let access = jwt.generate_access_token(user_id).unwrap();
        let refresh = jwt.generate_refresh_token(user_id).unwrap();
        assert!(jwt.validate_refresh_token(&access).is_err());
        assert!(jwt.validate_access_token(&refresh).is_err());
        assert!(jwt.validate_refresh_token(&refresh).is_ok());
    }

    #[test]
    fn test_expired_and_garbage_tokens_are_rejected() {
        let jwt = JwtService::new(JwtConfig {
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            access_token_expiry: 0,
            refresh_token_expiry: 0,
        })
        .unwrap();

        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: 1,
            exp: 2,
            token_type: TokenType::Access,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(jwt.validate_access_token(&expired).is_err());
        assert!(jwt.validate_access_token("not.a.token").is_err());
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let result = JwtService::new(JwtConfig {
            access_token_secret: String::new(),
            refresh_token_secret: "x".to_string(),
            access_token_expiry: 1,
            refresh_token_expiry: 1,
        });
        assert!(result.is_err());
    }
}
