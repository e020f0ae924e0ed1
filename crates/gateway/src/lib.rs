//! Gateway front door: tenant authentication and REST dispatch.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Fill the application registry
//! 3. Build the router (auth interceptors, handlers, panic boundary)
//! 4. Bind the plain listener and, if enabled, the TLS listener
//! 5. Serve until Ctrl-C/SIGTERM
//!
//! Channel fan-out and the websocket transport live behind the traits in
//! `services.rs`; the gateway only authenticates and routes to them.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod server;
pub mod services;
pub mod state;

pub use {
    bootstrap::{run, start_gateway},
    server::build_gateway_app,
    services::GatewayServices,
    state::GatewayState,
};
