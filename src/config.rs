use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const APP_NAME: &str = "workflow-gateway";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Local address the REST surface listens on
    pub bind: String,
    /// Base URL every route is resolved against
    pub upstream_base_url: String,
    /// Environment variable holding the upstream API key
    pub api_key_env: String,
    /// Per-call upstream timeout, in seconds
    pub timeout_secs: u64,
    /// Browser origin allowed by CORS. `None` disables CORS headers.
    pub cors_origin: Option<String>,
    /// Largest inbound JSON body, in bytes
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
            upstream_base_url: "https://api.muapi.ai".into(),
            api_key_env: "MU_API_KEY".into(),
            timeout_secs: 60,
            cors_origin: Some("http://localhost:3000".into()),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Load(String),
    Invalid { field: &'static str, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Failed to load configuration: {}", msg),
            ConfigError::Invalid { field, message } => write!(f, "Invalid configuration for {}: {}", field, message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GatewayConfig {
    /// Load from an explicit file, or from the platform config directory.
    ///
    /// Missing files are created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, None),
        }
        .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.upstream_base()?;
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_key_env",
                message: "must name an environment variable".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                message: "must be greater than zero".into(),
            });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_body_bytes",
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|e| ConfigError::Invalid {
            field: "bind",
            message: format!("{}", e),
        })
    }

    pub fn upstream_base(&self) -> Result<Url, ConfigError> {
        let url: Url = self.upstream_base_url.parse().map_err(|e| ConfigError::Invalid {
            field: "upstream_base_url",
            message: format!("{}", e),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "upstream_base_url",
                message: format!("unsupported scheme {}", url.scheme()),
            });
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
