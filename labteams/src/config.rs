//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `LABTEAMS_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `LABTEAMS_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `LABTEAMS_AUTH__PROXY_HEADER__HEADER_NAME=x-user` sets `auth.proxy_header.header_name`.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use labteams::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! LABTEAMS_PORT=8080
//! DATABASE_URL="sqlite://notebook.db"
//! LABTEAMS_INITIAL_ADMIN__EMAIL=admin@lab.example
//! LABTEAMS_INITIAL_ADMIN__TEAM=1
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;
use crate::types::TeamId;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "LABTEAMS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Populated from `DATABASE_URL`; folded into `database.url` by [`Config::load`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    /// Admin account created on startup if no user with this email exists
    pub initial_admin: Option<InitialAdminConfig>,
    /// Export traces over OTLP (configured through the standard `OTEL_*` variables)
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://labteams.db`
    pub url: String,
    pub pool: PoolSettings,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_secs > 0).then(|| Duration::from_secs(self.max_lifetime_secs))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://labteams.db".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub proxy_header: ProxyHeaderAuthConfig,
}

/// Trusted proxy header authentication.
///
/// The notebook in front of this service owns sessions and forwards the id of the
/// logged-in user in `header_name`. Never expose this service without that proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyHeaderAuthConfig {
    /// The name of the HTTP header containing the numeric user id.
    pub header_name: String,
}

impl Default for ProxyHeaderAuthConfig {
    fn default() -> Self {
        Self {
            header_name: "x-labteams-user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InitialAdminConfig {
    pub email: String,
    pub team: TeamId,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            database_url: None,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            initial_admin: None,
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.auth.proxy_header.header_name.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: auth.proxy_header.header_name cannot be empty".to_string(),
            });
        }

        if axum::http::HeaderName::try_from(self.auth.proxy_header.header_name.as_str()).is_err() {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: auth.proxy_header.header_name {:?} is not a valid header name",
                    self.auth.proxy_header.header_name
                ),
            });
        }

        let pool = &self.database.pool;
        if pool.min_connections > pool.max_connections {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: database.pool.min_connections ({}) cannot be greater than max_connections ({})",
                    pool.min_connections, pool.max_connections
                ),
            });
        }

        if self.initial_admin.as_ref().is_some_and(|admin| admin.email.trim().is_empty()) {
            return Err(Error::Internal {
                operation: "Config validation: initial_admin.email cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("LABTEAMS_").ignore(&["config"]).split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.bind_address(), "0.0.0.0:3002");
            assert_eq!(config.auth.proxy_header.header_name, "x-labteams-user");
            assert_eq!(config.database.url, "sqlite://labteams.db");
            assert!(config.initial_admin.is_none());
            assert!(!config.enable_otel_export);

            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
database:
  url: sqlite://from-yaml.db
  pool:
    max_connections: 2
initial_admin:
  email: pi@lab.example
  team: 7
"#,
            )?;

            jail.set_env("LABTEAMS_HOST", "127.0.0.1");
            jail.set_env("LABTEAMS_CONFIG", "test.yaml");
            jail.set_env("LABTEAMS_AUTH__PROXY_HEADER__HEADER_NAME", "x-notebook-user");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.bind_address(), "127.0.0.1:4000");
            assert_eq!(config.database.url, "sqlite://from-yaml.db");
            assert_eq!(config.database.pool.max_connections, 2);
            assert_eq!(config.database.pool.acquire_timeout_secs, 30);
            assert_eq!(config.auth.proxy_header.header_name, "x-notebook-user");

            let admin = config.initial_admin.expect("initial admin configured");
            assert_eq!(admin.email, "pi@lab.example");
            assert_eq!(admin.team, 7);

            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "database:\n  url: sqlite://from-yaml.db\n")?;
            jail.set_env("DATABASE_URL", "sqlite://from-env.db");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.database.url, "sqlite://from-env.db");
            assert!(config.database_url.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "prot: 4000\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.auth.proxy_header.header_name = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.pool.min_connections = 10;
        config.database.pool.max_connections = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_connections"));

        let mut config = Config::default();
        config.initial_admin = Some(InitialAdminConfig {
            email: String::new(),
            team: 1,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_timeouts() {
        let mut pool = PoolSettings::default();
        assert_eq!(pool.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(pool.idle_timeout(), Some(Duration::from_secs(600)));

        pool.idle_timeout_secs = 0;
        pool.max_lifetime_secs = 0;
        assert_eq!(pool.idle_timeout(), None);
        assert_eq!(pool.max_lifetime(), None);
    }
}
