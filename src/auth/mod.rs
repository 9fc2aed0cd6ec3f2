//! Bearer-token authentication for protected HTTP paths

pub mod token;

pub use token::{extract_bearer_token, Claims, TokenManager};
