//! DRAC endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DracError, Result};

/// Environment variable holding the DRAC host name or address.
pub const ENV_HOST: &str = "DRAC_HOST";
/// Environment variable holding the DRAC user name.
pub const ENV_USERNAME: &str = "DRAC_USERNAME";
/// Environment variable holding the DRAC password.
pub const ENV_PASSWORD: &str = "DRAC_PASSWORD";
/// Environment variable overriding the WS-Man port.
pub const ENV_PORT: &str = "DRAC_PORT";
/// Environment variable overriding the WS-Man path.
pub const ENV_PATH: &str = "DRAC_PATH";
/// Environment variable overriding the protocol (`http` or `https`).
pub const ENV_PROTOCOL: &str = "DRAC_PROTOCOL";
/// Environment variable overriding the request timeout.
pub const ENV_TIMEOUT_SECS: &str = "DRAC_TIMEOUT_SECS";
/// Environment variable to accept self-signed certificates.
pub const ENV_INSECURE: &str = "DRAC_INSECURE";

/// Default WS-Man port.
pub const DEFAULT_PORT: u16 = 443;
/// Default WS-Man path.
pub const DEFAULT_PATH: &str = "/wsman";
/// Default protocol.
pub const DEFAULT_PROTOCOL: &str = "https";
/// Default timeout for WS-Man requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one DRAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Host name or IP address.
    pub host: String,
    /// WS-Man port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// WS-Man path.
    #[serde(default = "default_path")]
    pub path: String,
    /// `http` or `https`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// User name for basic authentication.
    pub username: String,
    /// Password for basic authentication.
    #[serde(skip_serializing)]
    pub password: String,
    /// Request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Accept self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl EndpointConfig {
    /// Create a configuration with default port, path and protocol.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            username: username.into(),
            password: password.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }

    /// Load the configuration from `DRAC_*` environment variables.
    ///
    /// # Errors
    /// Returns [`DracError::Config`] when a required variable is unset or an
    /// optional one cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            required_env(ENV_HOST)?,
            required_env(ENV_USERNAME)?,
            required_env(ENV_PASSWORD)?,
        );

        if let Ok(port) = std::env::var(ENV_PORT) {
            config.port = port
                .parse()
                .map_err(|e| DracError::Config(format!("{ENV_PORT}={port}: {e}")))?;
        }
        if let Ok(path) = std::env::var(ENV_PATH) {
            config.path = path;
        }
        if let Ok(protocol) = std::env::var(ENV_PROTOCOL) {
            config.protocol = protocol;
        }
        if let Ok(timeout) = std::env::var(ENV_TIMEOUT_SECS) {
            config.timeout_secs = timeout
                .parse()
                .map_err(|e| DracError::Config(format!("{ENV_TIMEOUT_SECS}={timeout}: {e}")))?;
        }
        config.accept_invalid_certs = std::env::var(ENV_INSECURE)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        config.validate()?;
        Ok(config)
    }

    /// Set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Accept self-signed certificates.
    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.accept_invalid_certs = insecure;
        self
    }

    /// Check that the settings can form a usable endpoint.
    ///
    /// # Errors
    /// Returns [`DracError::Config`] for an empty host or an unknown protocol.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DracError::Config("host must not be empty".to_string()));
        }
        if self.protocol != "http" && self.protocol != "https" {
            return Err(DracError::Config(format!(
                "unsupported protocol '{}'",
                self.protocol
            )));
        }
        Ok(())
    }

    /// Full endpoint URL.
    #[must_use]
    pub fn url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("{}://{}:{}/{path}", self.protocol, self.host, self.port)
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| DracError::Config(format!("{name} is not set")))
}
