//! Core functionality for the chat hub

pub mod arbiter;
pub mod connection;
pub mod hub;
pub mod identity;
pub mod message;
pub mod registry;
pub mod router;

// Re-export main components for convenience
pub use arbiter::SessionArbiter;
pub use connection::{CloseReason, Connection, ConnectionId};
pub use hub::{ChatHub, SharedHub};
pub use identity::{resolve_identity, Identity};
pub use message::{Capabilities, Payload, PayloadKind};
pub use registry::{BroadcastReport, ConnectionRegistry};
pub use router::{MessageRouter, RouteOutcome};
