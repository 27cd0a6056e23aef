//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports a TOML config file, `.env.local`/`.env` files and environment
//! variable overrides.
//!
//! The two hosted-backend credentials (`SUPABASE_URL`, `SUPABASE_KEY`) are
//! required. [`BackendConfig::credentials`] fails when either is missing; the
//! binaries treat that as fatal.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::routing::{HistoryMode, Profile, RouteTable};
use crate::theme::Theme;

/// Environment variable holding the backend endpoint URL
pub const URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the backend API key
pub const KEY_VAR: &str = "SUPABASE_KEY";

const LEGACY_URL_VAR: &str = "VITE_SUPABASE_URL";
const LEGACY_KEY_VAR: &str = "VITE_SUPABASE_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub theme: Theme,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Endpoint URL (e.g. `https://xyz.supabase.co`)
    #[serde(default)]
    pub url: Option<String>,

    /// Anonymous API key
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub realtime: RealtimeConfig,
}

fn default_table() -> String {
    "table_status".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: default_table(),
            schema: default_schema(),
            request_timeout_ms: default_request_timeout(),
            realtime: RealtimeConfig::default(),
        }
    }
}

/// Validated backend credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    pub url: String,
    pub key: String,
}

impl BackendConfig {
    /// Fail-fast check that both credentials are present and non-empty
    pub fn credentials(&self) -> Result<BackendCredentials, ConfigError> {
        let url = non_empty(self.url.as_deref())
            .ok_or(ConfigError::MissingCredential { name: URL_VAR })?;
        let key = non_empty(self.key.as_deref())
            .ok_or(ConfigError::MissingCredential { name: KEY_VAR })?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: URL_VAR,
                value: url.to_string(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        Ok(BackendCredentials {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Realtime subscription configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_realtime_enabled")]
    pub enabled: bool,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_realtime_enabled() -> bool {
    true
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: default_realtime_enabled(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built view bundle, served under `{base}assets/`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default = "default_max_connections")]
    pub max_ws_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8084
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_max_connections() -> usize {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_ws_connections: default_max_connections(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// View routing configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub history: HistoryMode,

    /// Deployment profile; picks the default base prefix
    #[serde(default)]
    pub profile: Profile,

    /// Explicit base prefix, overriding the profile default
    #[serde(default)]
    pub base: Option<String>,
}

impl RouterConfig {
    /// Effective base prefix
    pub fn base(&self) -> &str {
        self.base
            .as_deref()
            .unwrap_or_else(|| self.profile.default_base())
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.history, self.base())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from an explicit path, the default locations, or the environment.
    ///
    /// `.env.local` and then `.env` in the working directory are read first;
    /// neither overrides variables already set in the process environment.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        load_dotenv_files();

        if let Some(path) = explicit {
            tracing::info!("Loading config from {:?}", path);
            return Self::load_with_env(path);
        }

        for path in default_config_paths() {
            if path.exists() {
                let config = Self::load_with_env(&path)?;
                tracing::info!("Loaded config from {:?}", path);
                return Ok(config);
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Backend credentials
        if let Some(url) = var(URL_VAR).or_else(|| var(LEGACY_URL_VAR)) {
            self.backend.url = Some(url);
        }
        if let Some(key) = var(KEY_VAR).or_else(|| var(LEGACY_KEY_VAR)) {
            self.backend.key = Some(key);
        }
        if let Some(table) = var("PURPLEFOX_TABLE") {
            self.backend.table = table;
        }
        if let Some(enabled) = var("PURPLEFOX_REALTIME") {
            self.backend.realtime.enabled = parse_bool("PURPLEFOX_REALTIME", &enabled)?;
        }

        // API overrides
        if let Some(host) = var("PURPLEFOX_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("PURPLEFOX_PORT") {
            self.api.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "PURPLEFOX_PORT",
                value: port.clone(),
                reason: "expected a port number".to_string(),
            })?;
        }
        if let Some(dir) = var("PURPLEFOX_STATIC_DIR") {
            self.api.static_dir = dir;
        }

        // Router overrides
        if let Some(profile) = var("PURPLEFOX_ENV") {
            self.router.profile = profile.parse().map_err(|reason| ConfigError::Invalid {
                key: "PURPLEFOX_ENV",
                value: profile.clone(),
                reason,
            })?;
        }
        if let Some(history) = var("PURPLEFOX_HISTORY") {
            self.router.history = history.parse().map_err(|reason| ConfigError::Invalid {
                key: "PURPLEFOX_HISTORY",
                value: history.clone(),
                reason,
            })?;
        }
        if let Some(base) = var("PURPLEFOX_BASE") {
            self.router.base = Some(base);
        }

        // Logging overrides
        if let Some(level) = var("PURPLEFOX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("PURPLEFOX_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn load_dotenv_files() {
    for name in [".env.local", ".env"] {
        match dotenvy::from_filename(name) {
            Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to read {}: {}", name, e),
        }
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("./purplefox.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("purplefox").join("config.toml"));
    }
    paths
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("{name} must be provided (set it in the environment or in .env.local)")]
    MissingCredential { name: &'static str },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r##"# Purplefox Configuration
#
# Environment variables override these settings:
# - SUPABASE_URL, SUPABASE_KEY (required, may live in .env.local)
# - PURPLEFOX_TABLE, PURPLEFOX_REALTIME
# - PURPLEFOX_HOST, PURPLEFOX_PORT, PURPLEFOX_STATIC_DIR
# - PURPLEFOX_ENV, PURPLEFOX_HISTORY, PURPLEFOX_BASE
# - PURPLEFOX_LOG_LEVEL, PURPLEFOX_LOG_FORMAT

[backend]
# Hosted backend endpoint and API key. Both are required; prefer setting them
# in .env.local instead of this file.
# url = "https://your-project.supabase.co"
# key = ""

# Relation holding the table status rows
table = "table_status"
schema = "public"

# Request timeout in milliseconds
request_timeout_ms = 10000

[backend.realtime]
# Subscribe to row changes over the realtime websocket
enabled = true
heartbeat_interval_secs = 30
max_reconnect_attempts = 5

[api]
host = "0.0.0.0"
port = 8084

# Directory with the built view bundle (served under <base>assets/)
static_dir = "dist"

max_ws_connections = 1000

[router]
# History mode: path (real browser paths) or hash (#/tournament/...)
history = "path"

# development serves under "/", production under "/purplefox-poc/"
# profile = "production"

# Explicit base prefix, overriding the profile default
# base = "/purplefox-poc/"

[theme]
content = ["./index.html", "./src/**/*.rs"]
colors = [
    { family = "green", shade = "800", value = "#166534" },
    { family = "purple", shade = "DEFAULT", value = "#8b5cf6" },
]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"##
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.backend.table, "table_status");
        assert_eq!(config.api.port, 8084);
        assert_eq!(config.router.history, HistoryMode::Path);
        assert_eq!(config.theme.colors.len(), 2);
        assert!(config.backend.realtime.enabled);
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let mut config = Config::default();
        config
            .apply_overrides(vars(&[(KEY_VAR, "anon-key")]))
            .unwrap();

        let err = config.backend.credentials().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { name } if name == URL_VAR));
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let mut config = Config::default();
        config
            .apply_overrides(vars(&[(URL_VAR, "https://demo.supabase.co"), (KEY_VAR, "  ")]))
            .unwrap();

        let err = config.backend.credentials().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { name } if name == KEY_VAR));
    }

    #[test]
    fn test_credentials_present() {
        let mut config = Config::default();
        config
            .apply_overrides(vars(&[
                (URL_VAR, "https://demo.supabase.co/"),
                (KEY_VAR, "anon-key"),
            ]))
            .unwrap();

        let creds = config.backend.credentials().unwrap();
        assert_eq!(creds.url, "https://demo.supabase.co");
        assert_eq!(creds.key, "anon-key");
    }

    #[test]
    fn test_legacy_variable_names() {
        let mut config = Config::default();
        config
            .apply_overrides(vars(&[
                (LEGACY_URL_VAR, "http://localhost:54321"),
                (LEGACY_KEY_VAR, "local-key"),
            ]))
            .unwrap();

        assert!(config.backend.credentials().is_ok());
    }

    #[test]
    fn test_url_must_be_http() {
        let mut config = Config::default();
        config.backend.url = Some("demo.supabase.co".to_string());
        config.backend.key = Some("k".to_string());
        assert!(matches!(
            config.backend.credentials(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_router_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(vars(&[
                ("PURPLEFOX_ENV", "production"),
                ("PURPLEFOX_HISTORY", "hash"),
            ]))
            .unwrap();

        assert_eq!(config.router.base(), "/purplefox-poc/");
        assert_eq!(config.router.route_table().history(), HistoryMode::Hash);

        config
            .apply_overrides(vars(&[("PURPLEFOX_BASE", "/tables")]))
            .unwrap();
        assert_eq!(config.router.route_table().base(), "/tables/");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(vars(&[("PURPLEFOX_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PURPLEFOX_PORT", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purplefox.toml");
        std::fs::write(
            &path,
            r#"
[backend]
url = "https://demo.supabase.co"
key = "file-key"
table = "tables"

[router]
profile = "production"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend.table, "tables");
        assert_eq!(config.backend.credentials().unwrap().key, "file-key");
        assert_eq!(config.router.base(), "/purplefox-poc/");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/purplefox.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
