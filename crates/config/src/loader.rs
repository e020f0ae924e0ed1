use std::path::{Path, PathBuf};

use {anyhow::Context, tracing::debug};

use crate::{env_subst::substitute_env, schema::IpeConfig};

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Load config from the given path.
///
/// The raw text has environment references expanded before it is parsed.
/// Parsing is strict (unknown keys fail) and the result is validated.
pub fn load_config(path: &Path) -> anyhow::Result<IpeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(
        path = %path.display(),
        apps = config.apps.len(),
        ssl = config.ssl.enabled,
        "loaded config"
    );
    Ok(config)
}

/// Resolve the config path: explicit argument, or the default file name.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Parse already-substituted config text. The format follows the file
/// extension; anything that isn't `.toml` or `.json` is read as YAML.
pub fn parse_config(raw: &str, path: &Path) -> anyhow::Result<IpeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
