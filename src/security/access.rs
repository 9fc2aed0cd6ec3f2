//! Path-based access control
//!
//! Requests under a configured public prefix pass through; everything else
//! needs a valid bearer token.

use std::sync::Arc;

use log::{debug, warn};
use warp::{Filter, Rejection};

use crate::auth::token::{extract_bearer_token, TokenManager};
use crate::error::{HubError, Result};

/// Rejection raised when a protected path is requested without valid credentials
#[derive(Debug)]
pub struct AccessDenied(pub String);

impl warp::reject::Reject for AccessDenied {}

pub struct AccessPolicy {
    public_prefixes: Vec<String>,
    tokens: Option<TokenManager>,
}

impl AccessPolicy {
    /// `patterns` accept Ant-style suffixes: `/uploads/**` and `/uploads` are equivalent
    pub fn new(patterns: &[String], tokens: Option<TokenManager>) -> Self {
        let public_prefixes = patterns
            .iter()
            .map(|p| {
                p.trim()
                    .trim_end_matches("**")
                    .trim_end_matches('*')
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect();

        Self {
            public_prefixes,
            tokens,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|prefix| {
            prefix.is_empty()
                || path == prefix
                || (path.starts_with(prefix.as_str())
                    && path.as_bytes().get(prefix.len()) == Some(&b'/'))
        })
    }

    /// Decide whether a request for `path` carrying `authorization` may proceed
    pub fn authorize(&self, path: &str, authorization: Option<&str>) -> Result<()> {
        if self.is_public(path) {
            return Ok(());
        }

        let tokens = self.tokens.as_ref().ok_or_else(|| {
            HubError::Unauthorized("authentication is not configured".to_string())
        })?;
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or_else(|| HubError::Unauthorized("missing bearer token".to_string()))?;

        let claims = tokens.validate_token(token)?.claims;
        debug!("Authenticated request for {} as {}", path, claims.sub);
        Ok(())
    }
}

/// Filter enforcing `policy` on every request it guards
pub fn with_access_control(
    policy: Arc<AccessPolicy>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path::full()
        .and(warp::header::optional::<String>("authorization"))
        .and_then(move |path: warp::path::FullPath, authorization: Option<String>| {
            let policy = policy.clone();
            async move {
                match policy.authorize(path.as_str(), authorization.as_deref()) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!("Rejected request for {}: {}", path.as_str(), e);
                        Err(warp::reject::custom(AccessDenied(e.to_string())))
                    }
                }
            }
        })
        .untuple_one()
}
