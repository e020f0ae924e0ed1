//! Collaborator seams. Channel fan-out and websocket connections live outside
//! the gateway core; the router reaches them through these traits.

use std::sync::Arc;

use {
    async_trait::async_trait,
    axum::{
        Json,
        extract::Request,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    ipe_apps::Application,
    ipe_auth::QueryParams,
    serde_json::{Value, json},
    tracing::debug,
};

pub type ServiceResult = Result<Value, ServiceError>;

/// Errors a collaborator can report back to the REST caller.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Traits ───────────────────────────────────────────────────────────────────

/// Tenant-scoped channel operations behind the authenticated REST routes.
#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Publish an event (`POST /apps/{app_id}/events`).
    async fn publish(&self, app: &Application, event: Value) -> ServiceResult;

    /// List occupied channels (`GET /apps/{app_id}/channels`).
    async fn channels(&self, app: &Application, params: &QueryParams) -> ServiceResult;

    /// Describe one channel (`GET /apps/{app_id}/channels/{channel_name}`).
    async fn channel(
        &self,
        app: &Application,
        channel_name: &str,
        params: &QueryParams,
    ) -> ServiceResult;

    /// Users subscribed to a presence channel.
    async fn channel_users(&self, app: &Application, channel_name: &str) -> ServiceResult;
}

/// Websocket transport. Receives `GET /app/{key}` whole; the key is
/// resolved and validated by the implementation, not by the gateway.
#[async_trait]
pub trait ConnectionService: Send + Sync {
    async fn connect(&self, key: String, request: Request) -> Response;
}

// ── Noop implementations ─────────────────────────────────────────────────────

/// Channel service with no subscribers: every channel is empty.
pub struct NoopChannelService;

#[async_trait]
impl ChannelService for NoopChannelService {
    async fn publish(&self, app: &Application, _event: Value) -> ServiceResult {
        debug!(app_id = %app.app_id, "event dropped, no channel service configured");
        Ok(json!({}))
    }

    async fn channels(&self, _app: &Application, _params: &QueryParams) -> ServiceResult {
        Ok(json!({ "channels": {} }))
    }

    async fn channel(
        &self,
        _app: &Application,
        _channel_name: &str,
        _params: &QueryParams,
    ) -> ServiceResult {
        Ok(json!({ "occupied": false }))
    }

    async fn channel_users(&self, _app: &Application, _channel_name: &str) -> ServiceResult {
        Ok(json!({ "users": [] }))
    }
}

pub struct NoopConnectionService;

#[async_trait]
impl ConnectionService for NoopConnectionService {
    async fn connect(&self, _key: String, _request: Request) -> Response {
        (
            StatusCode::NOT_IMPLEMENTED,
            "websocket transport not available",
        )
            .into_response()
    }
}

// ── Bundle ───────────────────────────────────────────────────────────────────

/// The collaborators the router dispatches to.
#[derive(Clone)]
pub struct GatewayServices {
    pub channels: Arc<dyn ChannelService>,
    pub connections: Arc<dyn ConnectionService>,
}

impl GatewayServices {
    pub fn noop() -> Self {
        Self {
            channels: Arc::new(NoopChannelService),
            connections: Arc::new(NoopConnectionService),
        }
    }

    pub fn with_channels(mut self, channels: Arc<dyn ChannelService>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_connections(mut self, connections: Arc<dyn ConnectionService>) -> Self {
        self.connections = connections;
        self
    }
}

impl Default for GatewayServices {
    fn default() -> Self {
        Self::noop()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {axum::body::to_bytes, secrecy::SecretString};

    use super::*;

    fn app() -> Application {
        Application::new("test", "1", "key", SecretString::new("secret".into()))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn noop_channels_are_empty() {
        let service = NoopChannelService;
        let app = app();
        let params = QueryParams::new();

        assert_eq!(service.publish(&app, json!({"name": "e"})).await.unwrap(), json!({}));
        assert_eq!(
            service.channels(&app, &params).await.unwrap(),
            json!({ "channels": {} })
        );
        assert_eq!(
            service.channel(&app, "presence-a", &params).await.unwrap()["occupied"],
            false
        );
        assert_eq!(
            service.channel_users(&app, "presence-a").await.unwrap(),
            json!({ "users": [] })
        );
    }

    #[tokio::test]
    async fn noop_connections_are_not_implemented() {
        let response = NoopConnectionService
            .connect("key".into(), Request::new(axum::body::Body::empty()))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn service_error_maps_to_status() {
        let response = ServiceError::NotFound("no such channel".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "no such channel" }));

        let response = ServiceError::BadRequest("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ServiceError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
