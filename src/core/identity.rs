//! Identity resolution from connection metadata

use std::fmt;

use crate::constants::{IDENTITY_QUERY_KEY, UNKNOWN_IDENTITY};

/// Identity token a connection claims at open time.
///
/// Not unique per connection: two sockets may present the same identity, and
/// every socket without one shares the `unknown` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_IDENTITY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the fallback identity for connections that did not present one
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IDENTITY
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the identity carried by a connection URI such as `/chat?id=alice`.
///
/// The value of the first `id` query parameter is used, up to the next `&`
/// (or fragment) and percent-decoded. A missing, empty, or undecodable value
/// resolves to the `unknown` sentinel; this never fails.
pub fn resolve_identity(uri: &str) -> Identity {
    let query = match uri.split_once('?') {
        Some((_, query)) => query,
        None => return Identity::unknown(),
    };
    let query = query.split('#').next().unwrap_or_default();

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == IDENTITY_QUERY_KEY)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(Identity)
        .unwrap_or_else(Identity::unknown)
}
