//! Config schema: listener addresses, TLS, and the application list.
//!
//! Every section denies unknown keys, so a typo in the config file is a
//! parse error instead of a silently ignored setting.

use {secrecy::SecretString, serde::Deserialize};

/// Default plain listener address.
pub const DEFAULT_HOST: &str = "0.0.0.0:8080";

/// Root configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpeConfig {
    /// Plain HTTP listen address (`host:port`, or Go-style `:port`).
    #[serde(default = "default_host")]
    pub host: String,

    /// Optional TLS listener.
    #[serde(default)]
    pub ssl: SslConfig,

    /// Applications allowed to use the gateway.
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

/// TLS listener settings. PEM files are loaded from the given paths.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SslConfig {
    pub enabled: bool,
    pub host: String,
    pub certfile: String,
    pub keyfile: String,
}

/// One application (tenant) entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub name: String,
    pub appid: String,
    pub key: String,
    pub secret: SecretString,
    #[serde(default)]
    pub onlyssl: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub userevents: bool,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
}

/// Per-application webhook policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhooksConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for IpeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ssl: SslConfig::default(),
            apps: Vec::new(),
        }
    }
}
