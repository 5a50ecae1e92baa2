use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::prediction::{PredictOptions, DEFAULT_MODEL_DIR};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub prediction: PredictionSettings,
    #[serde(default)]
    pub events: EventSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Prediction transports and their time limits
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionSettings {
    /// Service-wide kill switch, checked before any per-request option
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub fallback_on_error: bool,
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
    pub ml_server_url: Option<String>,
    #[serde(default = "default_true")]
    pub use_http_api: bool,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_script_path")]
    pub script_path: PathBuf,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    #[serde(default = "default_spawn_timeout_secs")]
    pub spawn_timeout_secs: u64,
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Overall budget shared by every transport tried for one prediction
    #[serde(default = "default_total_budget_secs")]
    pub total_budget_secs: u64,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_on_error: true,
            model_dir: default_model_dir(),
            ml_server_url: None,
            use_http_api: true,
            interpreter: default_interpreter(),
            script_path: default_script_path(),
            http_timeout_ms: default_http_timeout_ms(),
            batch_timeout_ms: default_batch_timeout_ms(),
            spawn_timeout_secs: default_spawn_timeout_secs(),
            kill_grace_ms: default_kill_grace_ms(),
            total_budget_secs: default_total_budget_secs(),
        }
    }
}

impl PredictionSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn spawn_timeout(&self) -> Duration {
        Duration::from_secs(self.spawn_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn total_budget(&self) -> Duration {
        Duration::from_secs(self.total_budget_secs)
    }

    /// Options applied when a request carries none of its own
    pub fn default_options(&self) -> PredictOptions {
        PredictOptions {
            enabled: self.enabled,
            fallback_on_error: self.fallback_on_error,
            model_dir: self.model_dir.clone(),
            ml_server_url: self.ml_server_url.clone(),
            use_http_api: self.use_http_api,
        }
    }
}

fn default_true() -> bool { true }
fn default_model_dir() -> String { DEFAULT_MODEL_DIR.to_string() }
fn default_interpreter() -> String { "python3".to_string() }
fn default_script_path() -> PathBuf { PathBuf::from("ml/predict.py") }
fn default_http_timeout_ms() -> u64 { 5_000 }
fn default_batch_timeout_ms() -> u64 { 10_000 }
fn default_spawn_timeout_secs() -> u64 { 25 }
fn default_kill_grace_ms() -> u64 { 1_000 }
fn default_total_budget_secs() -> u64 { 35 }

/// Match event sink
#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// JSON Lines file the event writer appends to
    #[serde(default = "default_sink_path")]
    pub sink_path: PathBuf,
    #[serde(default = "default_preset")]
    pub default_preset: String,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            sink_path: default_sink_path(),
            default_preset: default_preset(),
        }
    }
}

fn default_sink_path() -> PathBuf { PathBuf::from("data/match_events.jsonl") }
fn default_preset() -> String { "balanced".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with KOVARI__)
    /// 4. `ML_SERVER_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., KOVARI__SERVER__PORT -> server.port
            .add_source(kovari_environment())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(kovari_environment())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }
}

fn kovari_environment() -> Environment {
    Environment::with_prefix("KOVARI")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply overrides from well-known, unprefixed environment variables
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = std::env::var("ML_SERVER_URL").ok().filter(|url| !url.trim().is_empty()) {
        builder = builder.set_override("prediction.ml_server_url", url)?;
    }

    builder.build()
}
