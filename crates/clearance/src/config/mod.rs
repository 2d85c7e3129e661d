//! Environment-driven settings. A `.env` file in the working directory is read first when
//! present; real environment variables always take precedence over it.

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REFERENCE_PREFIX: &str = "IMCF";

/// Deployment stage, parsed from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub clearance: ClearancePolicyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: read_var("APP_ENV")
                .map(|raw| AppEnvironment::parse(&raw))
                .unwrap_or_default(),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig::from_env(),
            clearance: ClearancePolicyConfig::from_env()?,
        })
    }
}

/// Non-blank value of an environment variable.
fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = match read_var("APP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort)?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: read_var("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    /// Resolve the bind address. `localhost` maps to the IPv4 loopback.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info,clearance=debug`.
    pub log_level: String,
}

impl TelemetryConfig {
    fn from_env() -> Self {
        Self {
            log_level: read_var("APP_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

/// Business rules for clearance form handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearancePolicyConfig {
    /// Lets remarks suppress duplicate conflicts when an existing form is edited.
    /// Creation always honours them.
    pub edit_remark_override: bool,
    /// Leading segment of generated reference numbers (`IMCF-2024-00001`).
    pub reference_prefix: String,
}

impl Default for ClearancePolicyConfig {
    fn default() -> Self {
        Self {
            edit_remark_override: false,
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
        }
    }
}

impl ClearancePolicyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let edit_remark_override = match read_var("CLEARANCE_EDIT_REMARK_OVERRIDE") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "CLEARANCE_EDIT_REMARK_OVERRIDE",
                value: raw,
            })?,
            None => defaults.edit_remark_override,
        };

        Ok(Self {
            edit_remark_override,
            reference_prefix: read_var("CLEARANCE_REFERENCE_PREFIX")
                .unwrap_or(defaults.reference_prefix),
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => f.write_str("APP_PORT must be a number between 0 and 65535"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST is not an IP address or localhost: {source}")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    const VARS: [&str; 6] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "CLEARANCE_EDIT_REMARK_OVERRIDE",
        "CLEARANCE_REFERENCE_PREFIX",
    ];

    /// Serialises tests that mutate the process environment and clears it on entry.
    fn clean_env() -> MutexGuard<'static, ()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let guard = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for name in VARS {
            env::remove_var(name);
        }
        guard
    }

    #[test]
    fn defaults_apply_without_env() {
        let _env = clean_env();
        let config = AppConfig::load().expect("defaults load");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.telemetry.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.clearance, ClearancePolicyConfig::default());
    }

    #[test]
    fn localhost_binds_loopback() {
        let _env = clean_env();
        env::set_var("APP_HOST", "localhost");
        env::set_var("APP_PORT", "8088");
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(
            config.server.socket_addr().expect("resolves"),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8088)
        );
    }

    #[test]
    fn bad_host_surfaces_on_resolution() {
        let server = ServerConfig {
            host: "clearance.internal".to_string(),
            port: DEFAULT_PORT,
        };
        assert!(matches!(
            server.socket_addr(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn bad_port_is_rejected() {
        let _env = clean_env();
        env::set_var("APP_PORT", "70000");
        let result = AppConfig::load();
        env::remove_var("APP_PORT");
        assert!(matches!(result, Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn clearance_policy_reads_overrides() {
        let _env = clean_env();
        env::set_var("CLEARANCE_EDIT_REMARK_OVERRIDE", "Yes");
        env::set_var("CLEARANCE_REFERENCE_PREFIX", " IM ");
        let config = AppConfig::load().expect("config loads");
        for name in VARS {
            env::remove_var(name);
        }
        assert!(config.clearance.edit_remark_override);
        assert_eq!(config.clearance.reference_prefix, "IM");
    }

    #[test]
    fn unparseable_flag_is_rejected() {
        let _env = clean_env();
        env::set_var("CLEARANCE_EDIT_REMARK_OVERRIDE", "sometimes");
        let result = AppConfig::load();
        env::remove_var("CLEARANCE_EDIT_REMARK_OVERRIDE");
        match result {
            Err(ConfigError::InvalidFlag { name, value }) => {
                assert_eq!(name, "CLEARANCE_EDIT_REMARK_OVERRIDE");
                assert_eq!(value, "sometimes");
            }
            other => panic!("expected flag error, got {other:?}"),
        }
    }
}
