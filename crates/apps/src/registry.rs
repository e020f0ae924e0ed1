use std::{collections::HashMap, sync::Arc};

use {ipe_config::AppConfig, tracing::debug};

use crate::Application;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("application with appid {0:?} is already registered")]
    DuplicateAppId(String),
    #[error("application key {key:?} (appid {app_id:?}) is already registered")]
    DuplicateKey { app_id: String, key: String },
    #[error("invalid application {app_id:?}: {reason}")]
    Invalid { app_id: String, reason: String },
    #[error("application not found")]
    NotFound,
}

/// In-memory registry of applications, keyed by app id.
///
/// Filled once at startup and shared behind an `Arc` afterwards, so lookups
/// from concurrent requests need no locking.
#[derive(Debug, Default)]
pub struct ApplicationRegistry {
    /// app_id → Application
    apps: HashMap<String, Arc<Application>>,
    /// key → app_id (websocket connections address tenants by key)
    by_key: HashMap<String, String>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from config entries, stopping at the first bad entry.
    pub fn from_config(entries: Vec<AppConfig>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.add(Application::from(entry))?;
        }
        Ok(registry)
    }

    /// Register an application. On error the registry is left untouched.
    pub fn add(&mut self, app: Application) -> Result<(), RegistryError> {
        app.validate()?;

        if self.apps.contains_key(&app.app_id) {
            return Err(RegistryError::DuplicateAppId(app.app_id));
        }
        if self.by_key.contains_key(&app.key) {
            return Err(RegistryError::DuplicateKey {
                app_id: app.app_id,
                key: app.key,
            });
        }

        debug!(
            app_id = %app.app_id,
            name = %app.name,
            enabled = app.enabled,
            "registered application"
        );
        self.by_key.insert(app.key.clone(), app.app_id.clone());
        self.apps.insert(app.app_id.clone(), Arc::new(app));
        Ok(())
    }

    /// Exact-match lookup by app id.
    pub fn get_by_app_id(&self, app_id: &str) -> Result<Arc<Application>, RegistryError> {
        self.apps
            .get(app_id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    /// Exact-match lookup by public key.
    pub fn get_by_key(&self, key: &str) -> Result<Arc<Application>, RegistryError> {
        self.by_key
            .get(key)
            .and_then(|app_id| self.apps.get(app_id))
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// All registered applications, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Application>> {
        self.apps.values()
    }
}
