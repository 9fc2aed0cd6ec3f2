//! Server configuration module
//! Handles dynamic configuration parameters for the chat hub and its HTTP endpoints

use crate::constants::{
    DEFAULT_ALLOWED_ORIGINS, DEFAULT_HOST, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MEDIA_DIR,
    DEFAULT_PERMIT_URLS, DEFAULT_PORT, DEFAULT_UPLOAD_DIR,
};
use crate::core::Capabilities;
use crate::error::{HubError, Result};
use std::env;
use std::path::PathBuf;

const ENV_PREFIX: &str = "CHAT_HUB_";

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory receiving binary chat payloads
    pub media_dir: PathBuf,
    /// Directory receiving files posted to the upload endpoint
    pub upload_dir: PathBuf,
    /// Base URL used to build `fileUrl` in upload responses
    pub public_base_url: String,
    /// Path prefixes served without authentication
    pub permit_urls: Vec<String>,
    /// HS256 secret for bearer tokens on protected paths
    pub jwt_secret: Option<String>,
    pub allowed_origins: Vec<String>,
    /// Text-analysis endpoint used by the sentiment route
    pub sentiment_url: Option<String>,
    pub sentiment_api_key: Option<String>,
    /// Payload kinds the hub relays
    pub capabilities: Capabilities,
    pub max_upload_bytes: u64,
    /// TLS configuration
    pub enable_tls: bool,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            public_base_url: format!("http://localhost:{}", DEFAULT_PORT),
            permit_urls: split_list(DEFAULT_PERMIT_URLS),
            jwt_secret: None,
            allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
            sentiment_url: None,
            sentiment_api_key: None,
            capabilities: Capabilities::all(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            enable_tls: false,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl ServerConfig {
    /// Validate that the token secret meets minimal strength requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(HubError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        let insecure_patterns = ["your-secret-key", "change-this", "password", "12345"];
        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(HubError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Generate one with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Build configuration from an arbitrary key lookup (keys without the `CHAT_HUB_` prefix)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = match lookup("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| HubError::ConfigError(format!("Invalid port: {}", p)))?,
            None => defaults.port,
        };

        let media_dir = lookup("MEDIA_DIR").map(PathBuf::from).unwrap_or(defaults.media_dir);
        let upload_dir = lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir);
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let permit_urls = lookup("PERMIT_URLS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.permit_urls);
        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.allowed_origins);

        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty());
        if let Some(ref secret) = jwt_secret {
            Self::validate_jwt_secret(secret)?;
        }

        let sentiment_url = lookup("SENTIMENT_URL").filter(|s| !s.is_empty());
        let sentiment_api_key = lookup("SENTIMENT_API_KEY").filter(|s| !s.is_empty());

        let capabilities = Capabilities {
            text: lookup("ENABLE_TEXT").map(|v| is_truthy(&v)).unwrap_or(true),
            binary: lookup("ENABLE_BINARY").map(|v| is_truthy(&v)).unwrap_or(true),
        };

        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_upload_bytes);

        // TLS configuration
        let enable_tls = lookup("ENABLE_TLS").map(|v| is_truthy(&v)).unwrap_or(false);
        let tls_cert_path = lookup("TLS_CERT_PATH");
        let tls_key_path = lookup("TLS_KEY_PATH");

        if enable_tls {
            match (&tls_cert_path, &tls_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    if !std::path::Path::new(cert_path).exists() {
                        return Err(HubError::ConfigError(format!(
                            "TLS certificate file does not exist: {}",
                            cert_path
                        )));
                    }
                    if !std::path::Path::new(key_path).exists() {
                        return Err(HubError::ConfigError(format!(
                            "TLS private key file does not exist: {}",
                            key_path
                        )));
                    }
                }
                _ => {
                    return Err(HubError::ConfigError(
                        "TLS is enabled but CHAT_HUB_TLS_CERT_PATH or CHAT_HUB_TLS_KEY_PATH is not set"
                            .to_string(),
                    ))
                }
            }
        }

        Ok(Self {
            host,
            port,
            media_dir,
            upload_dir,
            public_base_url,
            permit_urls,
            jwt_secret,
            allowed_origins,
            sentiment_url,
            sentiment_api_key,
            capabilities,
            max_upload_bytes,
            enable_tls,
            tls_cert_path,
            tls_key_path,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
