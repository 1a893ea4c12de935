use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4400;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// `taskrow.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 4400).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,taskrow=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured).
    log_format: Option<String>,
    /// Base URL of the hosted auth/table provider.
    provider_url: Option<String>,
    /// Provider anon (publishable) API key — used for user-scoped calls.
    provider_anon_key: Option<String>,
    /// Provider service-role key — used for admin calls (user lookup, password set).
    provider_service_key: Option<String>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config file — using defaults");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind_address: String,
    pub log: String,
    /// "pretty" | "json".
    pub log_format: String,
    /// Base URL of the hosted auth/table provider (no trailing slash).
    pub provider_url: String,
    pub anon_key: String,
    pub service_key: String,
}

impl AppConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file (`--config-file`, default `taskrow.toml`)
    ///   3. Built-in defaults
    ///
    /// The three provider credentials have no defaults: a missing URL or key
    /// aborts startup rather than running against a half-configured backend.
    pub fn new(
        port: Option<u16>,
        config_file: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Result<Self> {
        let path = config_file.unwrap_or_else(|| PathBuf::from("taskrow.toml"));
        let toml = load_toml(&path).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("TASKROW_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let provider_url = env_or("TASKROW_PROVIDER_URL", toml.provider_url)
            .context("missing provider URL — set TASKROW_PROVIDER_URL or provider_url in taskrow.toml")?;
        let anon_key = env_or("TASKROW_PROVIDER_ANON_KEY", toml.provider_anon_key)
            .context("missing provider anon key — set TASKROW_PROVIDER_ANON_KEY or provider_anon_key in taskrow.toml")?;
        let service_key = env_or("TASKROW_PROVIDER_SERVICE_KEY", toml.provider_service_key)
            .context("missing provider service key — set TASKROW_PROVIDER_SERVICE_KEY or provider_service_key in taskrow.toml")?;

        Ok(Self {
            port,
            bind_address,
            log,
            log_format,
            provider_url: provider_url.trim_end_matches('/').to_string(),
            anon_key,
            service_key,
        })
    }
}

fn env_or(key: &str, fallback: Option<String>) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_parse() {
        let cfg: TomlConfig = toml::from_str(
            r#"
            port = 8080
            provider_url = "https://db.example.com"
            provider_anon_key = "anon"
            provider_service_key = "service"
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, Some(8080));
        assert_eq!(cfg.provider_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(cfg.log_format.as_deref(), Some("json"));
        assert!(cfg.bind_address.is_none());
    }

    #[test]
    fn partial_toml_uses_defaults_elsewhere() {
        let cfg: TomlConfig = toml::from_str("port = 9999").unwrap();
        assert_eq!(cfg.port, Some(9999));
        assert!(cfg.provider_url.is_none());
    }
}
