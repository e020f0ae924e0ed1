use std::any::Any;

use {
    axum::{
        Router,
        extract::{Path, Request, State},
        http::StatusCode,
        middleware,
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    tower::ServiceBuilder,
    tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer},
    tracing::error,
};

use crate::{api, auth, state::GatewayState};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
///
/// Tenant routes run `check_app_enabled` then `verify_signature` before the
/// handler. The connect route is handed to the connection service untouched.
pub fn build_gateway_app(state: GatewayState) -> Router {
    let tenant_auth = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::check_app_enabled,
        ))
        .layer(middleware::from_fn(auth::verify_signature));

    let tenant = Router::new()
        .route("/apps/{app_id}/events", post(api::post_events))
        .route("/apps/{app_id}/channels", get(api::get_channels))
        .route(
            "/apps/{app_id}/channels/{channel_name}",
            get(api::get_channel),
        )
        .route(
            "/apps/{app_id}/channels/{channel_name}/users",
            get(api::get_channel_users),
        )
        .route_layer(tenant_auth);

    Router::new()
        .route("/app/{key}", get(app_connect))
        .merge(tenant)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn app_connect(
    State(state): State<GatewayState>,
    Path(key): Path<String>,
    request: Request,
) -> Response {
    state.services.connections.connect(key, request).await
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
