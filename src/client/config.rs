//! MySQL source connection configuration

use super::dsn::DsnBuilder;
use crate::connection::{SecurityConfig, TlsRegistry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Host used when none is configured
pub const DEFAULT_HOST: &str = "localhost";
/// Standard MySQL port
pub const DEFAULT_PORT: u16 = 3306;
/// Database used when none is configured
pub const DEFAULT_DATABASE: &str = "mysql";
/// Reader threads used when none are configured
pub const DEFAULT_MAX_THREADS: usize = 3;
/// Backoff retries used when none are configured
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// How changed rows are picked up from the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateMethod {
    /// Periodic full or incremental reads
    #[default]
    Standard,
    /// Binlog change data capture
    Cdc {
        /// Seconds to wait for the first binlog event
        #[serde(default, alias = "intial_wait_time")]
        initial_wait_time: u64,
    },
}

impl UpdateMethod {
    /// Initial binlog wait, for CDC only
    pub fn initial_wait_time(&self) -> Option<Duration> {
        match self {
            UpdateMethod::Standard => None,
            UpdateMethod::Cdc { initial_wait_time } => {
                Some(Duration::from_secs(*initial_wait_time))
            }
        }
    }
}

/// Connection configuration
///
/// Deserialized from the source's JSON document, or assembled with
/// [`ConnectionConfig::builder`].
///
/// When `security` is present it takes precedence over `tls_skip_verify`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host (empty means `localhost` when building the DSN)
    #[serde(default, alias = "hosts")]
    pub host: String,
    /// Server port (0 means 3306 when building the DSN)
    #[serde(default)]
    pub port: u16,
    /// Username
    #[serde(default)]
    pub username: String,
    /// Password
    #[serde(default)]
    pub password: String,
    /// Database name
    #[serde(default)]
    pub database: String,
    /// Legacy switch: encrypt without any certificate verification
    #[serde(default)]
    pub tls_skip_verify: bool,
    /// Change tracking strategy
    #[serde(default)]
    pub update_method: UpdateMethod,
    /// Reader parallelism
    #[serde(default)]
    pub max_threads: usize,
    /// Backoff retry budget
    #[serde(default, rename = "backoff_retry_count")]
    pub retry_count: u32,
    /// Extra DSN parameters; values are percent-encoded in the DSN
    #[serde(
        default,
        rename = "jdbc_url_params",
        alias = "extra_params",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra_params: BTreeMap<String, String>,
    /// SSL configuration
    #[serde(
        default,
        rename = "ssl_config",
        alias = "security",
        skip_serializing_if = "Option::is_none"
    )]
    pub security: Option<SecurityConfig>,
}

impl ConnectionConfig {
    /// Create a builder for `host`
    ///
    /// # Examples
    ///
    /// ```
    /// use secure_dsn::client::ConnectionConfig;
    ///
    /// let config = ConnectionConfig::builder("db.internal")
    ///     .port(3307)
    ///     .username("replicator")
    ///     .password("secret")
    ///     .param("connectTimeout", "30000")
    ///     .build();
    /// assert_eq!(config.tls_profile_name(), "custom-tls-db.internal-3307");
    /// ```
    pub fn builder(host: impl Into<String>) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: ConnectionConfig {
                host: host.into(),
                ..Self::default()
            },
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Host after defaulting
    pub fn effective_host(&self) -> &str {
        if self.host.is_empty() {
            DEFAULT_HOST
        } else {
            &self.host
        }
    }

    /// Port after defaulting
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// Registry name used for this target's custom TLS profile
    pub fn tls_profile_name(&self) -> String {
        format!(
            "custom-tls-{}-{}",
            self.effective_host(),
            self.effective_port()
        )
    }

    /// Fill in database, thread and retry defaults
    pub fn apply_defaults(&mut self) {
        if self.database.is_empty() {
            self.database = DEFAULT_DATABASE.to_string();
        }
        if self.max_threads == 0 {
            self.max_threads = DEFAULT_MAX_THREADS;
        }
        if self.retry_count == 0 {
            self.retry_count = DEFAULT_RETRY_COUNT;
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`] for a missing or URL-like host, port 0, or
    ///   missing credentials
    /// * [`Error::InvalidSecurity`] if the SSL configuration is incomplete
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("empty host name".into()));
        }
        if self.host.contains("http") {
            return Err(Error::Config(format!(
                "host should not contain http or https: {}",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(Error::Config(
                "invalid port number: must be between 1 and 65535".into(),
            ));
        }
        if self.username.is_empty() {
            return Err(Error::Config("username is required".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("password is required".into()));
        }
        if let Some(ref security) = self.security {
            security.validate().map_err(Error::InvalidSecurity)?;
        }
        Ok(())
    }

    /// Validate, apply defaults and build the DSN.
    ///
    /// Certificate or registration problems are returned as errors rather
    /// than producing a DSN without its security clause.
    pub fn dsn(&self, registry: &TlsRegistry) -> Result<String> {
        let mut config = self.clone();
        config.apply_defaults();
        config.validate()?;
        DsnBuilder::new(registry).try_build(&config)
    }

    /// Build the DSN without validation, dropping the security clause if
    /// the TLS profile cannot be set up.
    pub fn dsn_lossy(&self, registry: &TlsRegistry) -> String {
        DsnBuilder::new(registry).build(self)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("tls_skip_verify", &self.tls_skip_verify)
            .field("update_method", &self.update_method)
            .field("max_threads", &self.max_threads)
            .field("retry_count", &self.retry_count)
            .field("extra_params", &self.extra_params)
            .field("security", &self.security)
            .finish()
    }
}

/// Builder for creating `ConnectionConfig`
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set the database name
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    /// Enable the legacy skip-verify TLS mode (ignored when `security` is set)
    pub fn tls_skip_verify(mut self, skip: bool) -> Self {
        self.config.tls_skip_verify = skip;
        self
    }

    /// Set the SSL configuration
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = Some(security);
        self
    }

    /// Add an extra DSN parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.extra_params.insert(key.into(), value.into());
        self
    }

    /// Set the update method
    pub fn update_method(mut self, method: UpdateMethod) -> Self {
        self.config.update_method = method;
        self
    }

    /// Set reader parallelism
    pub fn max_threads(mut self, threads: usize) -> Self {
        self.config.max_threads = threads;
        self
    }

    /// Set the backoff retry budget
    pub fn retry_count(mut self, retries: u32) -> Self {
        self.config.retry_count = retries;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
