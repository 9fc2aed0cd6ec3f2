//! Chat Hub - a real-time WebSocket connection hub
//!
//! This library provides the connection registry, identity arbitration and
//! message routing behind a chat feature, plus the small HTTP endpoints
//! (uploads, sentiment scoring, access control) served next to it.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod security;
pub mod sentiment;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use routes::{routes, AppState};
