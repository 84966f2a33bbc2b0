mod env_manager;

use crate::error::{Result, ServiceError};
use crate::harvest::{HarvestOptions, GITHUB_API_BASE, GITHUB_RAW_BASE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use env_manager::{get_env_value, load_dotenv, AwsCredentials};

/// Environment variables the service refuses to start without
pub const REQUIRED_ENV: &[&str] = &[
    "GEMINI_API_KEY",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_DEFAULT_REGION",
    "TRAINIUM_ENDPOINT",
];

/// Default Gemini REST API host
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Main configuration struct for the service
///
/// Secrets and endpoint identifiers come from the environment; tuning knobs
/// come from [`Settings`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Text generation model settings
    pub gemini: GeminiConfig,
    /// Inference endpoint settings
    pub inference: InferenceConfig,
    /// GitHub access settings
    pub github: GitHubConfig,
    /// Non-secret tuning knobs
    pub settings: Settings,
}

/// Gemini API access
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent with every request
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-flash`
    pub model: String,
    /// API host
    pub api_base: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// SageMaker inference endpoint access
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Endpoint name passed to `InvokeEndpoint`
    pub endpoint_name: String,
    /// Static credentials and region
    pub credentials: AwsCredentials,
}

/// GitHub access used by the harvester
#[derive(Clone)]
pub struct GitHubConfig {
    /// Optional token raising rate limits
    pub token: Option<String>,
    /// REST API host
    pub api_base: String,
    /// Raw content host
    pub raw_base: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .finish()
    }
}

impl GitHubConfig {
    /// Reads the optional GitHub settings from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            token: lookup("GITHUB_TOKEN"),
            api_base: lookup("GITHUB_API_BASE_URL").unwrap_or_else(|| GITHUB_API_BASE.to_string()),
            raw_base: lookup("GITHUB_RAW_BASE_URL").unwrap_or_else(|| GITHUB_RAW_BASE.to_string()),
        }
    }

    /// Reads the optional GitHub settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(get_env_value)
    }
}

/// Non-secret settings, optionally read from a TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Harvester and prompt budget settings
    pub harvest: HarvestSettings,
    /// Model selection
    pub model: ModelSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

/// Harvester and prompt budget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    /// Files declaring a larger content length are skipped
    pub max_file_size: u64,
    /// Characters of the harvest document forwarded to the inference endpoint
    pub max_context_chars: usize,
    /// Per-file fetch timeout in seconds
    pub file_timeout_secs: u64,
    /// Branches tried in order until one can be listed
    pub fallback_branches: Vec<String>,
    /// Allowed extensions; the built-in set is used when absent
    pub include_extensions: Option<Vec<String>>,
}

/// Model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Gemini model name
    pub gemini_model: String,
    /// Tokens the inference endpoint may generate
    pub max_new_tokens: u32,
    /// Sampling temperature for the inference endpoint
    pub temperature: f32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
        }
    }
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            max_file_size: 100_000,
            max_context_chars: 500,
            file_timeout_secs: 10,
            fallback_branches: vec!["main".to_string(), "master".to_string()],
            include_extensions: None,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.5-flash".to_string(),
            max_new_tokens: 150,
            temperature: 0.7,
        }
    }
}

impl HarvestSettings {
    /// Harvest options for these settings and an optional GitHub token
    pub fn options(&self, auth_token: Option<String>) -> HarvestOptions {
        HarvestOptions {
            include_extensions: self
                .include_extensions
                .as_ref()
                .map(|exts| exts.iter().cloned().collect()),
            auth_token,
            max_file_size: self.max_file_size,
            file_timeout: Duration::from_secs(self.file_timeout_secs),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from the default locations when `None`.
    ///
    /// Without an explicit path, `REPODIAGRAM_CONFIG` is consulted, then
    /// `<config dir>/repodiagram/config.toml`. Missing default files yield the
    /// built-in defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Some(path) = get_env_value("REPODIAGRAM_CONFIG") {
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("repodiagram").join("config.toml"))
    }

    /// Parses a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// A `.env` file is loaded first when present. Fails with
    /// [`ServiceError::MissingEnv`] naming every absent required variable.
    pub fn from_env(settings: Settings) -> Result<Self> {
        load_dotenv();
        Self::from_lookup(settings, get_env_value)
    }

    /// Builds the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(mut settings: Settings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_ENV
            .iter()
            .filter(|key| lookup(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::MissingEnv(missing));
        }

        let required = |key: &str| lookup(key).unwrap_or_default();

        if let Some(model) = lookup("GEMINI_MODEL") {
            settings.model.gemini_model = model;
        }
        if let Some(host) = lookup("HOST") {
            settings.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            settings.server.port = port
                .parse()
                .map_err(|_| ServiceError::Config(format!("PORT is not a valid port number: {}", port)))?;
        }

        Ok(Self {
            gemini: GeminiConfig {
                api_key: required("GEMINI_API_KEY"),
                model: settings.model.gemini_model.clone(),
                api_base: lookup("GEMINI_API_BASE_URL").unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            },
            inference: InferenceConfig {
                endpoint_name: required("TRAINIUM_ENDPOINT"),
                credentials: AwsCredentials {
                    access_key_id: required("AWS_ACCESS_KEY_ID"),
                    secret_access_key: required("AWS_SECRET_ACCESS_KEY"),
                    session_token: required("AWS_SESSION_TOKEN"),
                    region: required("AWS_DEFAULT_REGION"),
                },
            },
            github: GitHubConfig::from_lookup(&lookup),
            settings,
        })
    }
}
