pub mod overrides;

use crate::error::{PullError, Result};
use crate::stream::Stream;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Env var naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "SAAS_PULL_CONFIG";

/// Complete pull configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Streams to pull, in order
    #[serde(default = "default_streams")]
    pub streams: Vec<String>,
}

/// Vendor API endpoint and OAuth client credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

/// Where token and checkpoint state is kept between runs
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
    /// Base64-encoded 32-byte key; tokens are stored in clear without it
    #[serde(default, deserialize_with = "non_empty")]
    pub encryption_key: Option<String>,
}

/// Treats an empty or blank string as unset.
fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

fn default_token_file() -> PathBuf {
    PathBuf::from("tokens.state")
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from("checkpoints.state")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            checkpoint_file: default_checkpoint_file(),
            encryption_key: None,
        }
    }
}

/// Event output files
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("vectra_logs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// Transport settings for token requests
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Retries after the first attempt on connect/read failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds; retry n sleeps `backoff_factor * 2^(n-1)`
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    0.3
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Log sinks
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Append-only log file, disabled when unset or empty
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("app_logs/app.log"))
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_streams() -> Vec<String> {
    Stream::ALL.iter().map(|s| s.as_str().to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            state: StateConfig::default(),
            output: OutputConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
            streams: default_streams(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PullError::Config(format!("invalid TOML: {}", e)))
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PullError::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Load from `$SAAS_PULL_CONFIG` (default `config.toml`) and apply env overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Checks that everything a run needs is present.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("api.base_url", &self.api.base_url),
            ("api.client_id", &self.api.client_id),
            ("api.client_secret", &self.api.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(PullError::Config(format!(
                "missing required values: {}",
                missing.join(", ")
            )));
        }

        if self.http.backoff_factor < 0.0 || !self.http.backoff_factor.is_finite() {
            return Err(PullError::Config(
                "http.backoff_factor must be a non-negative number".to_string(),
            ));
        }

        self.streams()?;
        Ok(())
    }

    /// Configured streams, parsed.
    pub fn streams(&self) -> Result<Vec<Stream>> {
        self.streams.iter().map(|s| s.parse()).collect()
    }

    /// Full URL of the OAuth token endpoint.
    pub fn token_url(&self) -> String {
        join_url(&self.api.base_url, "oauth2/token")
    }
}

/// Joins a base URL and a relative path with exactly one slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
