//! Configuration management for the Qualtrics client

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ApiRequest;
use crate::error::{ConfigError, Result};

/// Environment variable overriding the API token
pub const ENV_API_TOKEN: &str = "QUALTRICS_API_TOKEN";
/// Environment variable overriding the data center
pub const ENV_DATA_CENTER: &str = "QUALTRICS_DATA_CENTER";
/// Environment variable overriding the XM Directory ID
pub const ENV_DIRECTORY_ID: &str = "QUALTRICS_DIRECTORY_ID";
/// Environment variable overriding the API base URL
pub const ENV_API_HOST: &str = "QUALTRICS_API_HOST";

/// Header carrying the API token on every request
pub const API_TOKEN_HEADER: &str = "X-API-TOKEN";

/// Library configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Qualtrics API token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Data center host label (e.g. `iad1`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_center: Option<String>,

    /// XM Directory ID (`POOL_...`), required for directory endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<String>,

    /// Full API base URL, overriding the one derived from the data center
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Export polling behaviour
    #[serde(default)]
    pub polling: PollSettings,

    /// Collection listing preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// Timing and retry limits for export jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay before the second status poll
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for the doubling poll delay
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,

    /// Total time an export may spend polling
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Submission attempts before giving up on retryable errors
    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,

    /// Delay between submission attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_poll_interval_ms() -> u64 {
    2000
}

fn default_deadline_secs() -> u64 {
    600
}

fn default_max_submit_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            deadline_secs: default_deadline_secs(),
            max_submit_attempts: default_max_submit_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl PollSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Submission attempts, never less than one.
    pub fn submit_attempts(&self) -> u32 {
        self.max_submit_attempts.max(1)
    }
}

/// Collection listing preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Page size requested from paginated endpoints
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum pages a single listing may follow
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_page_size() -> usize {
    100
}

fn default_max_pages() -> usize {
    10_000
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".qualtrics").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from the default path if present, then apply
    /// environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = match Self::load() {
            Ok(config) => config,
            Err(crate::error::Error::Config(ConfigError::NotFound(_))) => Self::default(),
            Err(err) => return Err(err),
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // The file holds an API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Override credential fields from an environment lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(dc) = get(ENV_DATA_CENTER) {
            self.data_center = Some(dc);
        }
        if let Some(dir) = get(ENV_DIRECTORY_ID) {
            self.directory_id = Some(dir);
        }
        if let Some(host) = get(ENV_API_HOST) {
            self.base_url = Some(host);
        }
    }

    /// Validate the credential fields and build [`Credentials`].
    pub fn credentials(&self) -> Result<Credentials> {
        let api_token = self
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingApiToken)?;

        let data_center = self
            .data_center
            .as_deref()
            .map(str::trim)
            .filter(|dc| !dc.is_empty())
            .ok_or(ConfigError::MissingDataCenter)?;

        let mut credentials = Credentials::new(api_token, data_center)?;
        if let Some(dir) = self.directory_id.as_deref().filter(|d| !d.trim().is_empty()) {
            credentials = credentials.with_directory_id(dir.trim());
        }
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            credentials = credentials.with_base_url(url.trim());
        }
        Ok(credentials)
    }
}

/// Validated API credentials, shared read-only by every request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_token: String,
    data_center: String,
    directory_id: Option<String>,
    base_url: Option<String>,
}

// Keeps the token out of debug logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<redacted>")
            .field("data_center", &self.data_center)
            .field("directory_id", &self.directory_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Credentials {
    /// Create credentials for a token and data center.
    pub fn new(api_token: impl Into<String>, data_center: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        let data_center = data_center.into();

        if api_token.trim().is_empty() {
            return Err(ConfigError::MissingApiToken.into());
        }
        let valid_label = !data_center.is_empty()
            && data_center
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid_label {
            return Err(ConfigError::InvalidDataCenter(data_center).into());
        }

        Ok(Self {
            api_token,
            data_center,
            directory_id: None,
            base_url: None,
        })
    }

    pub fn with_directory_id(mut self, directory_id: impl Into<String>) -> Self {
        self.directory_id = Some(directory_id.into());
        self
    }

    /// Use an explicit base URL instead of the data-center host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn data_center(&self) -> &str {
        &self.data_center
    }

    /// The XM Directory ID, required by directory endpoints.
    pub fn directory_id(&self) -> Result<&str> {
        self.directory_id
            .as_deref()
            .ok_or(ConfigError::MissingDirectoryId.into())
    }

    /// API root, e.g. `https://iad1.qualtrics.com/API/v3`
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://{}.qualtrics.com/API/v3", self.data_center),
        }
    }

    /// Absolute URL for an API path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Authenticated request for a path relative to the base URL.
    pub fn request(&self, method: reqwest::Method, path: &str) -> ApiRequest {
        self.request_url(method, self.url(path))
    }

    /// Authenticated request for an absolute URL (e.g. a next-page link).
    pub fn request_url(&self, method: reqwest::Method, url: impl Into<String>) -> ApiRequest {
        ApiRequest::new(method, url).header(API_TOKEN_HEADER, self.api_token.clone())
    }
}
