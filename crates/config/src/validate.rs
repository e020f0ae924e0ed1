use crate::schema::{IpeConfig, SslConfig};

/// Listener-level configuration errors. Per-application problems are
/// reported by the registry when the applications are registered.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("ssl is enabled but `ssl.{0}` is empty")]
    MissingSslField(&'static str),
}

impl IpeConfig {
    /// Check the listener settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        self.ssl.validate()
    }
}

impl SslConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        for (field, value) in [
            ("host", &self.host),
            ("certfile", &self.certfile),
            ("keyfile", &self.keyfile),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingSslField(field));
            }
        }
        Ok(())
    }
}

/// Turn a Go-style `:port` address into `0.0.0.0:port`.
pub fn normalize_listen_addr(host: &str) -> String {
    let host = host.trim();
    if host.starts_with(':') {
        format!("0.0.0.0{host}")
    } else {
        host.to_string()
    }
}
