//! Request handlers for different server endpoints

pub mod rejection;
pub mod sentiment;
pub mod upload;
pub mod websocket;

pub use rejection::handle_rejection;
pub use sentiment::handle_sentiment;
pub use upload::handle_upload;
pub use websocket::handle_ws_client;
