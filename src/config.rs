//! Configuration management for breachscout
//!
//! Tunables live in `./config/breachscout.toml`; the template shipped with
//! the binary is the single source of defaults. Provider credentials are
//! never stored in the TOML file, they come from the environment.

use serde::Deserialize;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/breachscout.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/breachscout.toml");

/// Environment variable holding the breach-list provider key
pub const HIBP_KEY_VAR: &str = "HIBP_API_KEY";
/// Environment variable holding the firmographics provider key
pub const APOLLO_KEY_VAR: &str = "APOLLO_API_KEY";
/// Environment variable holding the optional IP-intelligence token
pub const IPINFO_TOKEN_VAR: &str = "IPINFO_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' is out of range: {value} (allowed {allowed})")]
    OutOfRange {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Missing required environment variable {0} (set it in the environment or a .env file)")]
    MissingEnvVar(&'static str),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
    pub rate_limits: RateLimitsConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub waf: WafConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub ip_api_timeout_secs: u64,
}

/// Base URLs for the external providers. Overridable so test harnesses can
/// point clients at local mock servers.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    pub breach_base_url: String,
    pub firmographics_base_url: String,
    pub ip_api_base_url: String,
}

/// Per-service admission ceilings and throttle response knobs
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitsConfig {
    pub firmographics_per_minute: u32,
    pub breach_per_minute: u32,
    pub default_per_minute: u32,
    pub cooldown_secs: u64,
    pub low_water_mark: u32,
}

/// Orchestrator fan-out and retry tuning
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub max_workers: usize,
    pub similar_targets_per_domain: usize,
    pub retry_attempts: u32,
    pub retry_backoff_base_secs: u64,
}

/// WAF-detector subprocess configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WafConfig {
    #[serde(default = "default_waf_binary")]
    pub binary: String,
    #[serde(default = "default_waf_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_waf_binary() -> String {
    "wafw00f".to_string()
}

fn default_waf_timeout_secs() -> u64 {
    20
}

impl Default for WafConfig {
    fn default() -> Self {
        Self {
            binary: default_waf_binary(),
            timeout_secs: default_waf_timeout_secs(),
        }
    }
}

/// Report and watermark file locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    #[serde(default = "default_watermark_file")]
    pub watermark_file: String,
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_watermark_file() -> String {
    "data/last_run.txt".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            watermark_file: default_watermark_file(),
        }
    }
}

/// Provider credentials, environment-only.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub breach_list_key: String,
    pub firmographics_key: String,
    pub ip_api_token: Option<String>,
}

impl ApiCredentials {
    /// Read credentials from the environment. The IP-intelligence token is
    /// optional; the endpoint answers unauthenticated at a lower quota.
    pub fn from_env() -> Result<Self, ConfigError> {
        let breach_list_key =
            env::var(HIBP_KEY_VAR).map_err(|_| ConfigError::MissingEnvVar(HIBP_KEY_VAR))?;
        let firmographics_key =
            env::var(APOLLO_KEY_VAR).map_err(|_| ConfigError::MissingEnvVar(APOLLO_KEY_VAR))?;
        let ip_api_token = env::var(IPINFO_TOKEN_VAR).ok().filter(|t| !t.is_empty());

        Ok(Self {
            breach_list_key,
            firmographics_key,
            ip_api_token,
        })
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }
        if self.http.ip_api_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.ip_api_timeout_secs".to_string(),
            });
        }

        for (field, url) in [
            ("providers.breach_base_url", &self.providers.breach_base_url),
            (
                "providers.firmographics_base_url",
                &self.providers.firmographics_base_url,
            ),
            ("providers.ip_api_base_url", &self.providers.ip_api_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl {
                    field: field.to_string(),
                    url: url.clone(),
                });
            }
        }

        if self.rate_limits.default_per_minute == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "rate_limits.default_per_minute".to_string(),
            });
        }

        if self.pipeline.max_workers == 0 || self.pipeline.max_workers > 64 {
            return Err(ConfigError::OutOfRange {
                field: "pipeline.max_workers".to_string(),
                value: self.pipeline.max_workers.to_string(),
                allowed: "1-64".to_string(),
            });
        }
        if self.pipeline.retry_attempts == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "pipeline.retry_attempts".to_string(),
            });
        }
        if self.pipeline.similar_targets_per_domain > 25 {
            return Err(ConfigError::OutOfRange {
                field: "pipeline.similar_targets_per_domain".to_string(),
                value: self.pipeline.similar_targets_per_domain.to_string(),
                allowed: "0-25".to_string(),
            });
        }

        if self.waf.binary.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "waf.binary".to_string(),
            });
        }
        if self.output.directory.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.directory".to_string(),
            });
        }
        if self.output.watermark_file.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.watermark_file".to_string(),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}
