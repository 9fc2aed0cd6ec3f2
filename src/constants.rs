// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const CHAT_PATH: &str = "chat";
pub const UPLOADS_PATH: &str = "uploads";

// Identity assigned to connections that do not carry an `id` query parameter
pub const UNKNOWN_IDENTITY: &str = "unknown";
pub const IDENTITY_QUERY_KEY: &str = "id";

// Storage locations
pub const DEFAULT_MEDIA_DIR: &str = "media";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

// Access control and CORS
pub const DEFAULT_PERMIT_URLS: &str = "/chat,/uploads/**,/diary/**,/health";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:1003";
