//! Security module for access control on HTTP paths

pub mod access;

pub use access::{with_access_control, AccessDenied, AccessPolicy};
