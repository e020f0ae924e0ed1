//! Tenant model: applications and the registry the gateway authenticates against.

pub mod application;
pub mod registry;

pub use {
    application::{Application, WebHooks},
    registry::{ApplicationRegistry, RegistryError},
};
