use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::http::HeaderSet;
use crate::response::ReadMode;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENDPOINT_VAR: &str = "RESTCALL_ENDPOINT";
pub const TIMEOUT_MS_VAR: &str = "RESTCALL_TIMEOUT_MS";
pub const READ_MODE_VAR: &str = "RESTCALL_READ_MODE";

/// Configuration for `RestClient`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub read_mode: ReadMode,
    pub headers: HeaderSet,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            read_mode: ReadMode::default(),
            headers: HeaderSet::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_ms(self, millis: u64) -> Self {
        self.with_timeout(Duration::from_millis(millis))
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Create configuration from environment variables
    ///
    /// Expects:
    /// - `RESTCALL_ENDPOINT`: absolute base URL (required)
    /// - `RESTCALL_TIMEOUT_MS`: timeout in milliseconds (default: 30000)
    /// - `RESTCALL_READ_MODE`: `full` or `bounded` (default: `full`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = std::env::var(ENDPOINT_VAR).map_err(|_| ConfigError::Missing(ENDPOINT_VAR))?;
        let mut config = Self::new(endpoint);

        if let Ok(raw) = std::env::var(TIMEOUT_MS_VAR) {
            let millis = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: TIMEOUT_MS_VAR,
                value: raw.clone(),
            })?;
            config = config.with_timeout_ms(millis);
        }

        if let Ok(raw) = std::env::var(READ_MODE_VAR) {
            let mode = raw.trim().parse::<ReadMode>().map_err(|_| ConfigError::InvalidValue {
                name: READ_MODE_VAR,
                value: raw.clone(),
            })?;
            config = config.with_read_mode(mode);
        }

        config.validate()?;
        Ok(config)
    }

    /// The endpoint must be an absolute http(s) URL that can carry path segments.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("cannot be a base URL".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: TIMEOUT_MS_VAR,
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
