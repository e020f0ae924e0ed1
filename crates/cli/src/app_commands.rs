use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    anyhow::{Context, Result},
    ipe_apps::{Application, ApplicationRegistry},
    ipe_auth::{KEY_PARAM, QueryParams, SIGNATURE_PARAM, TIMESTAMP_PARAM, sign_request},
    ipe_config::{IpeConfig, load_config, normalize_listen_addr},
    ipe_gateway::bootstrap::build_registry,
};

/// Load and validate the config, build the registry, print a summary.
pub fn check(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let listeners = listener_summary(&config);
    let registry = build_registry(config.apps)?;

    println!("{}: ok", path.display());
    for line in listeners {
        println!("{line}");
    }
    for line in app_summary(&registry) {
        println!("{line}");
    }
    Ok(())
}

/// Print `query` with `auth_signature` appended, signed as app `app_id`.
pub fn sign(
    path: &Path,
    app_id: &str,
    method: &str,
    request_path: &str,
    query: Option<&str>,
) -> Result<()> {
    let config = load_config(path)?;
    let registry = build_registry(config.apps)?;
    let app = registry
        .get_by_app_id(app_id)
        .with_context(|| format!("appid {app_id:?} not found in {}", path.display()))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs();

    println!(
        "{}",
        signed_query(&app, method, request_path, query.unwrap_or_default(), now)?
    );
    Ok(())
}

fn listener_summary(config: &IpeConfig) -> Vec<String> {
    let mut lines = vec![format!("http:  {}", normalize_listen_addr(&config.host))];
    if config.ssl.enabled {
        lines.push(format!(
            "https: {} (cert {}, key {})",
            normalize_listen_addr(&config.ssl.host),
            config.ssl.certfile,
            config.ssl.keyfile
        ));
    }
    lines
}

fn app_summary(registry: &ApplicationRegistry) -> Vec<String> {
    let mut apps: Vec<_> = registry.iter().collect();
    apps.sort_by(|a, b| a.app_id.cmp(&b.app_id));

    let mut lines = vec![format!("{} application(s)", apps.len())];
    lines.extend(apps.into_iter().map(|app| {
        let mut flags = vec![if app.enabled { "enabled" } else { "disabled" }];
        if app.only_ssl {
            flags.push("onlyssl");
        }
        if app.user_events {
            flags.push("userevents");
        }
        if app.webhooks.enabled {
            flags.push("webhooks");
        }
        format!(
            "  {} {:?} key={} [{}]",
            app.app_id,
            app.name,
            app.key,
            flags.join(", ")
        )
    }));
    lines
}

/// Fill in `auth_key` and `auth_timestamp` when absent, then append the
/// signature. Any `auth_signature` already in `query` is replaced.
fn signed_query(
    app: &Application,
    method: &str,
    request_path: &str,
    query: &str,
    now: u64,
) -> Result<String> {
    let mut params = QueryParams::parse(query.trim_start_matches('?'));
    params.remove(SIGNATURE_PARAM);
    if !params.contains(KEY_PARAM) {
        params.push(KEY_PARAM, app.key.as_str());
    }
    if !params.contains(TIMESTAMP_PARAM) {
        params.push(TIMESTAMP_PARAM, now.to_string());
    }

    let signature = sign_request(app.secret(), method, request_path, &params)?;
    params.push(SIGNATURE_PARAM, signature);
    Ok(params.to_query_string())
}
