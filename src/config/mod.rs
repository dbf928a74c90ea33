use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_HTTP_PORT: u16 = 7300;
const DEFAULT_WS_PORT: u16 = 7301;
const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP API port (default: 7300).
    http_port: Option<u16>,
    /// WebSocket event-push port (default: 7301).
    ws_port: Option<u16>,
    /// Bind address for both servers (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,trackd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Allowed CORS origin for the HTTP API (default: http://localhost:5173).
    cors_origin: Option<String>,
    /// HMAC secret for signing JWTs. Omit to use the generated per-install
    /// secret at `{data_dir}/jwt_secret`.
    jwt_secret: Option<String>,
    /// Token lifetime in days (default: 7).
    token_ttl_days: Option<i64>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── ServerConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub ws_port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// "pretty" (default) | "json" (structured for Loki/Elasticsearch).
    pub log_format: String,
    pub cors_origin: String,
    /// None means use (or create) the per-install secret file.
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
}

impl ServerConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        http_port: Option<u16>,
        ws_port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let http_port = http_port.or(toml.http_port).unwrap_or(DEFAULT_HTTP_PORT);
        let ws_port = ws_port.or(toml.ws_port).unwrap_or(DEFAULT_WS_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("TRACKD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("TRACKD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let cors_origin = std::env::var("TRACKD_CORS_ORIGIN")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.cors_origin)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let jwt_secret = std::env::var("TRACKD_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.jwt_secret);

        let token_ttl_days = toml.token_ttl_days.unwrap_or(DEFAULT_TOKEN_TTL_DAYS);

        Self {
            http_port,
            ws_port,
            bind_address,
            data_dir,
            log,
            log_format,
            cors_origin,
            jwt_secret,
            token_ttl_days,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/trackd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("trackd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/trackd or ~/.local/share/trackd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("trackd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("trackd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\trackd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("trackd");
        }
    }
    // Fallback
    PathBuf::from(".trackd")
}
