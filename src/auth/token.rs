use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (caller ID)
    pub sub: String,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at (as UTC timestamp)
    pub iat: usize,
}

impl Claims {
    /// Creates claims valid for the given number of hours
    pub fn with_expiration(subject: String, hours: usize) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        Self {
            sub: subject,
            exp: now + hours * 3600,
            iat: now,
        }
    }
}

/// Manages JWT token operations
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenManager {
    /// Creates a new token manager with a secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Generates a JWT token for the given claims
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| HubError::Unauthorized(format!("Failed to generate token: {}", e)))
    }

    /// Validates and decodes a JWT token; expiry is checked by the validation
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| HubError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn test_token_roundtrip() {
        let manager = TokenManager::new(SECRET);
        let token = manager
            .generate_token(&Claims::with_expiration("diary-app".to_string(), 1))
            .unwrap();
        assert_eq!(manager.validate_token(&token).unwrap().claims.sub, "diary-app");
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = TokenManager::new("another-secret-also-long-enough-for-hs256")
            .generate_token(&Claims::with_expiration("x".to_string(), 1))
            .unwrap();
        let result = TokenManager::new(SECRET).validate_token(&token);
        assert!(matches!(result, Err(HubError::Unauthorized(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
