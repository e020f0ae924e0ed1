use std::sync::Arc;

use ipe_apps::ApplicationRegistry;

use crate::services::GatewayServices;

/// Shared router state. Cloned per request; everything inside is behind `Arc`.
///
/// The registry is frozen before the state is built, so handlers and
/// middleware read it without locks.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<ApplicationRegistry>,
    pub services: GatewayServices,
    /// Server version string.
    pub version: &'static str,
}

impl GatewayState {
    pub fn new(registry: Arc<ApplicationRegistry>, services: GatewayServices) -> Self {
        Self {
            registry,
            services,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
