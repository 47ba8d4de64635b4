pub mod constants;
pub mod settings;

pub use settings::{AuthConfig, Config, DatabaseConfig, LoggingConfig, RedisConfig, ServerConfig};
