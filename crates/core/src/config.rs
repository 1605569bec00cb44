use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ratelimit::RateLimitConfig;
use crate::scheduler::lifecycle::LifecycleConfig;
use crate::scheduler::SchedulerConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub scheduler: SchedulerSettings,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct SchedulerSettings {
    pub tick_interval_secs: u64,
    pub max_retry_attempts: u32,
    pub backoff_base_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct RateLimitSettings {
    pub per_minute: u32,
    pub per_hour: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub tick_interval_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_attempts: 3,
            },
            scheduler: SchedulerSettings {
                tick_interval_secs: 60,
                max_retry_attempts: 3,
                backoff_base_minutes: 1,
            },
            rate_limit: RateLimitSettings { per_minute: 10, per_hour: 100 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Precedence: defaults, then file, then environment, then programmatic
    /// overrides. Validation runs last and fails fast.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cadence.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_attempts) = llm.max_attempts {
                self.llm.max_attempts = max_attempts;
            }
        }

        if let Some(scheduler) = patch.scheduler {
            if let Some(tick_interval_secs) = scheduler.tick_interval_secs {
                self.scheduler.tick_interval_secs = tick_interval_secs;
            }
            if let Some(max_retry_attempts) = scheduler.max_retry_attempts {
                self.scheduler.max_retry_attempts = max_retry_attempts;
            }
            if let Some(backoff_base_minutes) = scheduler.backoff_base_minutes {
                self.scheduler.backoff_base_minutes = backoff_base_minutes;
            }
        }

        if let Some(rate_limit) = patch.rate_limit {
            if let Some(per_minute) = rate_limit.per_minute {
                self.rate_limit.per_minute = per_minute;
            }
            if let Some(per_hour) = rate_limit.per_hour {
                self.rate_limit.per_hour = per_hour;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CADENCE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CADENCE_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("CADENCE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CADENCE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CADENCE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CADENCE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CADENCE_LLM_MAX_ATTEMPTS") {
            self.llm.max_attempts = parse_u32("CADENCE_LLM_MAX_ATTEMPTS", &value)?;
        }

        if let Some(value) = read_env("CADENCE_SCHEDULER_TICK_INTERVAL_SECS") {
            self.scheduler.tick_interval_secs =
                parse_u64("CADENCE_SCHEDULER_TICK_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("CADENCE_SCHEDULER_MAX_RETRY_ATTEMPTS") {
            self.scheduler.max_retry_attempts =
                parse_u32("CADENCE_SCHEDULER_MAX_RETRY_ATTEMPTS", &value)?;
        }

        if let Some(value) = read_env("CADENCE_RATE_LIMIT_PER_MINUTE") {
            self.rate_limit.per_minute = parse_u32("CADENCE_RATE_LIMIT_PER_MINUTE", &value)?;
        }
        if let Some(value) = read_env("CADENCE_RATE_LIMIT_PER_HOUR") {
            self.rate_limit.per_hour = parse_u32("CADENCE_RATE_LIMIT_PER_HOUR", &value)?;
        }

        if let Some(value) = read_env("CADENCE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CADENCE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(tick_interval_secs) = overrides.tick_interval_secs {
            self.scheduler.tick_interval_secs = tick_interval_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_scheduler(&self.scheduler)?;
        validate_rate_limit(&self.rate_limit)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            tick_interval_secs: settings.tick_interval_secs,
            lifecycle: LifecycleConfig {
                default_max_retry_attempts: settings.max_retry_attempts,
                backoff_base_minutes: settings.backoff_base_minutes,
            },
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self { per_minute: settings.per_minute, per_hour: settings.per_hour }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cadence.toml"), PathBuf::from("config/cadence.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_attempts == 0 || llm.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "llm.max_attempts must be in range 1..=10".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_scheduler(scheduler: &SchedulerSettings) -> Result<(), ConfigError> {
    if scheduler.tick_interval_secs == 0 || scheduler.tick_interval_secs > 3_600 {
        return Err(ConfigError::Validation(
            "scheduler.tick_interval_secs must be in range 1..=3600".to_string(),
        ));
    }

    if scheduler.max_retry_attempts > 10 {
        return Err(ConfigError::Validation(
            "scheduler.max_retry_attempts must be at most 10".to_string(),
        ));
    }

    if scheduler.backoff_base_minutes < 1 {
        return Err(ConfigError::Validation(
            "scheduler.backoff_base_minutes must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit(rate_limit: &RateLimitSettings) -> Result<(), ConfigError> {
    if rate_limit.per_minute == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.per_minute must be greater than zero".to_string(),
        ));
    }

    if rate_limit.per_hour < rate_limit.per_minute {
        return Err(ConfigError::Validation(
            "rate_limit.per_hour must be at least rate_limit.per_minute".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    scheduler: Option<SchedulerPatch>,
    rate_limit: Option<RateLimitPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    tick_interval_secs: Option<u64>,
    max_retry_attempts: Option<u32>,
    backoff_base_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitPatch {
    per_minute: Option<u32>,
    per_hour: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
