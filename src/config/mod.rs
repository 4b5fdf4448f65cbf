//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `STRATA_*` environment variables.

pub mod cache;
pub mod error;


pub use cache::CacheSettings;
pub use error::ConfigError;

use std::env;
use std::net::IpAddr;

/// Execution mode of the server. Diagnostic endpoints only answer in development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Returns `true` for [`Environment::Development`].
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownEnvironment {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `STRATA_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Execution mode. Default: production.
    pub environment: Environment,

    /// Redis URL for the distributed tier. `None` runs the cache local-only.
    pub redis_url: Option<String>,

    /// Cache settings.
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            environment: Environment::default(),
            redis_url: None,
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "STRATA_PORT";
    const ENV_BIND_ADDR: &'static str = "STRATA_BIND_ADDR";
    const ENV_ENVIRONMENT: &'static str = "STRATA_ENVIRONMENT";
    const ENV_REDIS_URL: &'static str = "STRATA_REDIS_URL";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let environment = match env::var(Self::ENV_ENVIRONMENT) {
            Ok(value) => value.parse()?,
            Err(_) => defaults.environment,
        };
        let redis_url = env::var(Self::ENV_REDIS_URL)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let cache = CacheSettings::from_env()?;

        Ok(Self {
            port,
            bind_addr,
            environment,
            redis_url,
            cache,
        })
    }

    /// Validates basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }
}
