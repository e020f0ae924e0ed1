//! Startup: config → registry → router → listeners.
//!
//! Every step either succeeds or aborts startup. Both listeners are bound
//! before the first request is served, so a port conflict on either one
//! stops the process instead of leaving half a server running.

use std::{net::SocketAddr, path::Path, sync::Arc};

use {
    anyhow::Context,
    axum::Router,
    ipe_apps::ApplicationRegistry,
    ipe_config::{AppConfig, IpeConfig, SslConfig, load_config, normalize_listen_addr},
    tokio::net::TcpListener,
    tracing::{error, info, warn},
};

#[cfg(feature = "tls")]
use {
    axum_server::{Handle, tls_rustls::RustlsConfig},
    std::time::Duration,
    tokio::task::JoinHandle,
};

use crate::{server::build_gateway_app, services::GatewayServices, state::GatewayState};

// ── Listeners ────────────────────────────────────────────────────────────────

/// TLS listener with its certificate chain already loaded.
#[cfg(feature = "tls")]
pub struct TlsListener {
    pub listener: std::net::TcpListener,
    pub config: RustlsConfig,
}

/// Bound sockets, ready to serve.
pub struct Listeners {
    pub plain: TcpListener,
    #[cfg(feature = "tls")]
    pub tls: Option<TlsListener>,
}

impl Listeners {
    pub fn plain_addr(&self) -> std::io::Result<SocketAddr> {
        self.plain.local_addr()
    }

    #[cfg(feature = "tls")]
    pub fn tls_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.tls.as_ref().map(|tls| tls.listener.local_addr())
    }
}

/// Bind the plain listener and, when enabled, the TLS listener.
pub async fn bind_listeners(host: &str, ssl: &SslConfig) -> anyhow::Result<Listeners> {
    #[cfg(not(feature = "tls"))]
    reject_tls(ssl)?;

    let addr = normalize_listen_addr(host);
    let plain = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;

    Ok(Listeners {
        plain,
        #[cfg(feature = "tls")]
        tls: bind_tls(ssl).await?,
    })
}

#[cfg(feature = "tls")]
async fn bind_tls(ssl: &SslConfig) -> anyhow::Result<Option<TlsListener>> {
    if !ssl.enabled {
        return Ok(None);
    }

    // Another component may have installed a provider already.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = RustlsConfig::from_pem_file(&ssl.certfile, &ssl.keyfile)
        .await
        .with_context(|| {
            format!(
                "failed to load TLS certificate {} / key {}",
                ssl.certfile, ssl.keyfile
            )
        })?;

    let addr = normalize_listen_addr(&ssl.host);
    let listener = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("failed to bind TLS listener on {addr}"))?;
    listener.set_nonblocking(true)?;

    Ok(Some(TlsListener { listener, config }))
}

#[cfg(not(feature = "tls"))]
fn reject_tls(ssl: &SslConfig) -> anyhow::Result<()> {
    if ssl.enabled {
        anyhow::bail!("ssl is enabled but this build has no TLS support");
    }
    Ok(())
}

// ── Startup ──────────────────────────────────────────────────────────────────

/// Register every configured application, failing on the first bad entry.
pub fn build_registry(apps: Vec<AppConfig>) -> anyhow::Result<ApplicationRegistry> {
    let registry = ApplicationRegistry::from_config(apps).context("invalid application list")?;
    if registry.is_empty() {
        warn!("no applications configured, every REST request will be rejected");
    }
    Ok(registry)
}

/// Load the config file at `path` and run the gateway until shutdown.
pub async fn run(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    start_gateway(config, GatewayServices::noop()).await
}

/// Build the registry and router from `config`, bind, and serve.
pub async fn start_gateway(config: IpeConfig, services: GatewayServices) -> anyhow::Result<()> {
    let IpeConfig { host, ssl, apps } = config;

    let registry = Arc::new(build_registry(apps)?);
    let state = GatewayState::new(Arc::clone(&registry), services);
    let app = build_gateway_app(state.clone());

    let listeners = bind_listeners(&host, &ssl).await?;

    // Startup banner.
    let enabled = registry.iter().filter(|a| a.enabled).count();
    let mut lines = vec![
        format!("ipe gateway v{}", state.version),
        format!("listening on http://{}", listeners.plain_addr()?),
    ];
    #[cfg(feature = "tls")]
    if let Some(addr) = listeners.tls_addr() {
        lines.push(format!("listening on https://{}", addr?));
    }
    lines.push(format!(
        "{} applications registered ({} enabled)",
        registry.len(),
        enabled
    ));
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    serve(listeners, app).await
}

/// Serve `app` on every bound listener until Ctrl-C/SIGTERM.
#[cfg(feature = "tls")]
pub async fn serve(listeners: Listeners, app: Router) -> anyhow::Result<()> {
    let Listeners { plain, tls } = listeners;
    let handle = Handle::new();

    let tls_task = tls.map(|tls| {
        let app = app.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            axum_server::from_tcp_rustls(tls.listener, tls.config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        })
    });

    let shutdown = async move {
        shutdown_signal().await;
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    };
    let plain = async move { axum::serve(plain, app).with_graceful_shutdown(shutdown).await };

    join_servers(plain, tls_task).await?;
    info!("gateway stopped");
    Ok(())
}

/// Drive the plain server and the TLS task together. Whichever stops first
/// with an error ends serving; the other one is torn down.
#[cfg(feature = "tls")]
async fn join_servers<P>(
    plain: P,
    tls_task: Option<JoinHandle<std::io::Result<()>>>,
) -> anyhow::Result<()>
where
    P: Future<Output = std::io::Result<()>>,
{
    let Some(mut tls_task) = tls_task else {
        return plain.await.context("HTTP listener failed");
    };

    tokio::pin!(plain);
    tokio::select! {
        result = &mut plain => {
            if let Err(e) = result {
                tls_task.abort();
                return Err(e).context("HTTP listener failed");
            }
            tls_task
                .await
                .context("TLS listener task aborted")?
                .context("TLS listener failed")
        },
        result = &mut tls_task => {
            match result {
                // Only a graceful shutdown ends the TLS server cleanly, and the
                // plain server is winding down from the same signal.
                Ok(Ok(())) => plain.await.context("HTTP listener failed"),
                Ok(Err(e)) => {
                    error!(error = %e, "TLS listener stopped");
                    Err(e).context("TLS listener failed")
                },
                Err(e) => Err(e).context("TLS listener task aborted"),
            }
        },
    }
}

#[cfg(not(feature = "tls"))]
pub async fn serve(listeners: Listeners, app: Router) -> anyhow::Result<()> {
    axum::serve(listeners.plain, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP listener failed")?;
    info!("gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        ipe_config::parse_config,
        tokio::io::{AsyncReadExt, AsyncWriteExt},
    };

    use super::*;

    fn config(yaml: &str) -> IpeConfig {
        parse_config(yaml, Path::new("config.yml")).unwrap()
    }

    #[test]
    fn registry_rejects_duplicate_app_id() {
        let cfg = config(
            r#"
apps:
  - { appid: "1", key: "a", secret: "x", enabled: true }
  - { appid: "1", key: "b", secret: "y", enabled: true }
"#,
        );
        let err = build_registry(cfg.apps).unwrap_err();
        assert!(format!("{err:#}").contains("already registered"), "{err:#}");
    }

    #[test]
    fn registry_counts_apps() {
        let cfg = config(
            r#"
apps:
  - { appid: "1", key: "a", secret: "x", enabled: true }
  - { appid: "2", key: "b", secret: "y" }
"#,
        );
        let registry = build_registry(cfg.apps).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(!registry.get_by_app_id("2").unwrap().enabled);
    }

    #[tokio::test]
    async fn binds_plain_listener() {
        let listeners = bind_listeners("127.0.0.1:0", &SslConfig::default())
            .await
            .unwrap();
        assert_ne!(listeners.plain_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn port_in_use_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let err = bind_listeners(&addr, &SslConfig::default())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("failed to bind HTTP listener"));
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn missing_tls_files_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ssl = SslConfig {
            enabled: true,
            host: "127.0.0.1:0".into(),
            certfile: dir.path().join("cert.pem").display().to_string(),
            keyfile: dir.path().join("key.pem").display().to_string(),
        };
        let err = bind_listeners("127.0.0.1:0", &ssl).await.err().unwrap();
        assert!(err.to_string().contains("failed to load TLS certificate"));
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn failed_tls_server_ends_serving() {
        let tls = tokio::spawn(async {
            Err::<(), _>(std::io::Error::other("accept loop died"))
        });
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            join_servers(std::future::pending::<std::io::Result<()>>(), Some(tls)),
        )
        .await
        .expect("serving should stop when the TLS server fails");
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("TLS listener failed"), "{err:#}");
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn failed_plain_server_ends_serving() {
        let tls = tokio::spawn(std::future::pending::<std::io::Result<()>>());
        let plain = async { Err::<(), _>(std::io::Error::other("listener closed")) };
        let err = join_servers(plain, Some(tls)).await.unwrap_err();
        assert!(format!("{err:#}").contains("HTTP listener failed"), "{err:#}");
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn clean_shutdown_of_both_servers_is_ok() {
        let tls = tokio::spawn(async { Ok::<(), std::io::Error>(()) });
        join_servers(async { Ok(()) }, Some(tls)).await.unwrap();
        join_servers(async { Ok::<(), std::io::Error>(()) }, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_config_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("absent.yml")).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_apps_abort_before_binding() {
        let cfg = config(
            r#"
host: "127.0.0.1:0"
apps:
  - { appid: "1", key: "a", secret: "x" }
  - { appid: "2", key: "a", secret: "y" }
"#,
        );
        let err = start_gateway(cfg, GatewayServices::noop()).await.unwrap_err();
        assert!(format!("{err:#}").contains("invalid application list"));
    }

    #[tokio::test]
    async fn serves_requests_on_bound_listener() {
        let listeners = bind_listeners("127.0.0.1:0", &SslConfig::default())
            .await
            .unwrap();
        let addr = listeners.plain_addr().unwrap();
        let state = GatewayState::new(
            Arc::new(ApplicationRegistry::new()),
            GatewayServices::noop(),
        );
        let server = tokio::spawn(serve(listeners, build_gateway_app(state)));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /apps/1/channels HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 401"), "{response}");

        server.abort();
    }
}
