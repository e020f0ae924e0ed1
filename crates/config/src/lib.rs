//! Gateway configuration: schema, environment expansion, strict loading.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{DEFAULT_CONFIG_FILE, config_path, load_config, parse_config},
    schema::{AppConfig, IpeConfig, SslConfig, WebhooksConfig},
    validate::{ConfigError, normalize_listen_addr},
};
