//! Authenticated REST handlers. Each one runs only after both auth
//! interceptors have passed and hands off to the channel service.

use {
    axum::{
        Extension, Json,
        body::Bytes,
        extract::{Path, RawQuery, State},
        response::{IntoResponse, Response},
    },
    ipe_auth::QueryParams,
    serde_json::Value,
    tracing::debug,
};

use crate::{
    auth::AuthenticatedApp,
    services::{ServiceError, ServiceResult},
    state::GatewayState,
};

fn respond(result: ServiceResult) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => err.into_response(),
    }
}

fn params_of(query: Option<String>) -> QueryParams {
    QueryParams::parse(query.as_deref().unwrap_or_default())
}

/// `POST /apps/{app_id}/events`
pub async fn post_events(
    State(state): State<GatewayState>,
    Extension(AuthenticatedApp(app)): Extension<AuthenticatedApp>,
    body: Bytes,
) -> Response {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            debug!(app_id = %app.app_id, error = %e, "rejected malformed event body");
            return ServiceError::BadRequest(format!("invalid event body: {e}")).into_response();
        },
    };
    respond(state.services.channels.publish(&app, event).await)
}

/// `GET /apps/{app_id}/channels`
pub async fn get_channels(
    State(state): State<GatewayState>,
    Extension(AuthenticatedApp(app)): Extension<AuthenticatedApp>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = params_of(query);
    respond(state.services.channels.channels(&app, &params).await)
}

/// `GET /apps/{app_id}/channels/{channel_name}`
pub async fn get_channel(
    State(state): State<GatewayState>,
    Extension(AuthenticatedApp(app)): Extension<AuthenticatedApp>,
    Path((_app_id, channel_name)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = params_of(query);
    respond(
        state
            .services
            .channels
            .channel(&app, &channel_name, &params)
            .await,
    )
}

/// `GET /apps/{app_id}/channels/{channel_name}/users`
pub async fn get_channel_users(
    State(state): State<GatewayState>,
    Extension(AuthenticatedApp(app)): Extension<AuthenticatedApp>,
    Path((_app_id, channel_name)): Path<(String, String)>,
) -> Response {
    respond(state.services.channels.channel_users(&app, &channel_name).await)
}
