use {
    ipe_config::{AppConfig, WebhooksConfig},
    secrecy::{ExposeSecret, SecretString},
};

use crate::RegistryError;

/// A registered tenant of the gateway.
///
/// The secret never appears in `Debug` output.
#[derive(Debug)]
pub struct Application {
    /// Display label, not unique.
    pub name: String,
    /// Unique id used in REST paths (`/apps/{app_id}/...`).
    pub app_id: String,
    /// Public identifier used in the websocket path (`/app/{key}`).
    pub key: String,
    secret: SecretString,
    pub only_ssl: bool,
    pub enabled: bool,
    pub user_events: bool,
    pub webhooks: WebHooks,
}

/// Webhook delivery policy for an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebHooks {
    pub enabled: bool,
    pub url: String,
}

impl Application {
    pub fn new(
        name: impl Into<String>,
        app_id: impl Into<String>,
        key: impl Into<String>,
        secret: SecretString,
    ) -> Self {
        Self {
            name: name.into(),
            app_id: app_id.into(),
            key: key.into(),
            secret,
            only_ssl: false,
            enabled: true,
            user_events: false,
            webhooks: WebHooks::default(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_only_ssl(mut self, only_ssl: bool) -> Self {
        self.only_ssl = only_ssl;
        self
    }

    pub fn with_user_events(mut self, user_events: bool) -> Self {
        self.user_events = user_events;
        self
    }

    pub fn with_webhooks(mut self, webhooks: WebHooks) -> Self {
        self.webhooks = webhooks;
        self
    }

    /// The shared signing secret. Only request verification should read it.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Check the fields the gateway relies on.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::Invalid {
            app_id: self.app_id.clone(),
            reason: reason.to_string(),
        };

        if self.app_id.trim().is_empty() {
            return Err(invalid("appid must not be empty"));
        }
        if self.key.trim().is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if self.secret.expose_secret().is_empty() {
            return Err(invalid("secret must not be empty"));
        }
        if self.webhooks.enabled {
            match url::Url::parse(&self.webhooks.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {},
                Ok(_) => return Err(invalid("webhooks.url must be an http(s) URL")),
                Err(e) => return Err(invalid(&format!("webhooks.url: {e}"))),
            }
        }
        Ok(())
    }
}

impl From<WebhooksConfig> for WebHooks {
    fn from(config: WebhooksConfig) -> Self {
        Self {
            enabled: config.enabled,
            url: config.url,
        }
    }
}

/// Build an application from its config entry. The secret is moved, not copied.
impl From<AppConfig> for Application {
    fn from(config: AppConfig) -> Self {
        Self {
            name: config.name,
            app_id: config.appid,
            key: config.key,
            secret: config.secret,
            only_ssl: config.onlyssl,
            enabled: config.enabled,
            user_events: config.userevents,
            webhooks: config.webhooks.into(),
        }
    }
}
