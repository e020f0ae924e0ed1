//! REST authentication for tenant-scoped routes.
//!
//! Two interceptors run in a fixed order, each handing the request to the
//! rest of the chain through `Next`:
//!
//! 1. [`check_app_enabled`] resolves `{app_id}` and rejects unknown or
//!    disabled applications before any cryptography runs.
//! 2. [`verify_signature`] checks `auth_signature` against the canonical
//!    request string, keyed by the application secret.
//!
//! A rejected request is answered with `401 Not authorized` and never retried.

use std::{collections::HashMap, sync::Arc};

use {
    axum::{
        extract::{Path, Request, State, rejection::PathRejection},
        http::StatusCode,
        middleware::Next,
        response::{IntoResponse, Response},
    },
    ipe_apps::Application,
    ipe_auth::{QueryParams, SIGNATURE_PARAM, canonical_string},
    tracing::{debug, warn},
};

use crate::state::GatewayState;

// ── Types ────────────────────────────────────────────────────────────────────

/// Application resolved from the route, not yet authenticated.
#[derive(Debug, Clone)]
pub struct TenantApp(pub Arc<Application>);

/// Application whose request signature verified. Handlers extract this.
#[derive(Debug, Clone)]
pub struct AuthenticatedApp(pub Arc<Application>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    UnknownApp,
    AppDisabled,
    MissingSignature,
    InvalidSignature,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Every failure looks the same to the caller.
        (StatusCode::UNAUTHORIZED, "Not authorized").into_response()
    }
}

// ── Interceptors ─────────────────────────────────────────────────────────────

/// Stage A: reject unknown and disabled applications.
pub async fn check_app_enabled(
    State(state): State<GatewayState>,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Path(params) = params.map_err(|e| {
        warn!(
            path = %req.uri().path(),
            error = %e,
            "rejected request with undecodable app id"
        );
        AuthError::UnknownApp
    })?;
    let app_id = params.get("app_id").map(String::as_str).unwrap_or_default();

    let app = state.registry.get_by_app_id(app_id).map_err(|_| {
        warn!(app_id = %app_id, "rejected request for unknown application");
        AuthError::UnknownApp
    })?;

    if !app.enabled {
        warn!(app_id = %app_id, "rejected request for disabled application");
        return Err(AuthError::AppDisabled);
    }

    req.extensions_mut().insert(TenantApp(app));
    Ok(next.run(req).await)
}

/// Stage B: verify `auth_signature`. Runs after [`check_app_enabled`].
pub async fn verify_signature(mut req: Request, next: Next) -> Result<Response, AuthError> {
    let Some(TenantApp(app)) = req.extensions().get::<TenantApp>().cloned() else {
        warn!(path = %req.uri().path(), "signature check reached without a resolved application");
        return Err(AuthError::UnknownApp);
    };

    let mut params = QueryParams::parse(req.uri().query().unwrap_or_default());
    let Some(signature) = params.remove(SIGNATURE_PARAM) else {
        warn!(app_id = %app.app_id, "rejected request without auth_signature");
        return Err(AuthError::MissingSignature);
    };

    let to_sign = canonical_string(req.method().as_str(), req.uri().path(), &params);
    if !ipe_auth::verify(app.secret(), &to_sign, &signature) {
        warn!(
            app_id = %app.app_id,
            method = %req.method(),
            path = %req.uri().path(),
            "rejected request with invalid signature"
        );
        return Err(AuthError::InvalidSignature);
    }

    debug!(app_id = %app.app_id, path = %req.uri().path(), "request authenticated");
    req.extensions_mut().insert(AuthenticatedApp(app));
    Ok(next.run(req).await)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        axum::{Extension, Router, body::Body, http::Request, middleware, routing::get},
        ipe_apps::ApplicationRegistry,
        secrecy::SecretString,
        tower::{ServiceBuilder, ServiceExt},
    };

    use {super::*, crate::services::GatewayServices};

    fn state() -> GatewayState {
        let mut registry = ApplicationRegistry::new();
        registry
            .add(Application::new("on", "1", "key-1", SecretString::new("s3cr3t".into())))
            .unwrap();
        registry
            .add(
                Application::new("off", "2", "key-2", SecretString::new("s3cr3t".into()))
                    .with_enabled(false),
            )
            .unwrap();
        GatewayState::new(Arc::new(registry), GatewayServices::noop())
    }

    async fn whoami(Extension(AuthenticatedApp(app)): Extension<AuthenticatedApp>) -> String {
        app.app_id.clone()
    }

    async fn tenant(Extension(TenantApp(app)): Extension<TenantApp>) -> String {
        app.app_id.clone()
    }

    fn stage_a_only(state: GatewayState) -> Router {
        Router::new()
            .route("/apps/{app_id}/probe", get(tenant))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                check_app_enabled,
            ))
            .with_state(state)
    }

    fn both_stages(state: GatewayState) -> Router {
        Router::new()
            .route("/apps/{app_id}/whoami", get(whoami))
            .route_layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn_with_state(
                        state.clone(),
                        check_app_enabled,
                    ))
                    .layer(middleware::from_fn(verify_signature)),
            )
            .with_state(state)
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(req).await.unwrap().status()
    }

    fn signed_uri(path: &str, secret: &str) -> String {
        let params = QueryParams::parse("auth_key=key&auth_timestamp=1");
        let signature = ipe_auth::sign_request(
            &SecretString::new(secret.into()),
            "GET",
            path,
            &params,
        )
        .unwrap();
        format!("{path}?auth_key=key&auth_timestamp=1&auth_signature={signature}")
    }

    #[tokio::test]
    async fn stage_a_passes_enabled_app() {
        assert_eq!(status_of(stage_a_only(state()), "/apps/1/probe").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn stage_a_rejects_unknown_and_disabled() {
        assert_eq!(
            status_of(stage_a_only(state()), "/apps/9/probe").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(stage_a_only(state()), "/apps/2/probe").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn stage_a_rejects_undecodable_app_id() {
        assert_eq!(
            status_of(stage_a_only(state()), "/apps/%FF/probe").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn both_stages_accept_valid_signature() {
        let uri = signed_uri("/apps/1/whoami", "s3cr3t");
        let req = Request::builder().uri(&uri).body(Body::empty()).unwrap();
        let response = both_stages(state()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"1");
    }

    #[tokio::test]
    async fn disabled_app_rejected_with_valid_signature() {
        let uri = signed_uri("/apps/2/whoami", "s3cr3t");
        assert_eq!(status_of(both_stages(state()), &uri).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_or_wrong_signature_rejected() {
        assert_eq!(
            status_of(both_stages(state()), "/apps/1/whoami?auth_key=key&auth_timestamp=1").await,
            StatusCode::UNAUTHORIZED
        );
        let uri = signed_uri("/apps/1/whoami", "wrong-secret");
        assert_eq!(status_of(both_stages(state()), &uri).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stage_b_without_stage_a_rejects() {
        let router: Router = Router::new()
            .route("/apps/{app_id}/whoami", get(whoami))
            .route_layer(middleware::from_fn(verify_signature));
        let uri = signed_uri("/apps/1/whoami", "s3cr3t");
        assert_eq!(status_of(router, &uri).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejection_body_is_generic() {
        let response = AuthError::InvalidSignature.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Not authorized");
    }
}
