// Centralized configuration constants

// Network
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const MIN_VALID_PORT: u16 = 1024;
pub const MAX_VALID_PORT: u16 = 65535;
pub const MAX_WORKER_THREADS: usize = 256;

// Database (MySQL)
pub const DEFAULT_DB_POOL: u32 = 10;
pub const DEFAULT_DB_CONN_TIMEOUT_SECS: u64 = 30;

// Tokens and sessions
pub const DEFAULT_JWT_ISSUER: &str = "auth-service";
pub const MIN_JWT_SECRET_BYTES: usize = 32;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// 7 days
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

// Passwords
pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt only reads the first 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

// Profile fields, in characters; match the accounts table columns
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_PHONE_LENGTH: usize = 32;

// HTTP transport
pub const SESSION_COOKIE_NAME: &str = "session_token";
pub const SESSION_HEADER_NAME: &str = "X-Session-Token";
pub const DEFAULT_CORS_MAX_AGE_SECS: usize = 3600;
pub const HTTP_KEEPALIVE_SECS: u64 = 75;
pub const HTTP_CLIENT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const HTTP_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// Logging
pub const DEFAULT_LOG_FILTER: &str = "herb_auth_server=info,actix_web=info";
