//! DSN assembly
//!
//! Chooses the `tls` clause for a [`ConnectionConfig`], publishing a custom
//! TLS profile in the registry when the mode needs certificate material.

use super::config::ConnectionConfig;
use super::connection_string::{format_addr, DsnInfo, TlsParam, TLS_PARAM};
use crate::connection::{SecurityMode, TlsProfileBuilder, TlsRegistry};
use crate::error::ValidationError;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Builds go-sql-driver style DSNs.
///
/// The security clause is chosen top to bottom, first match wins:
///
/// | Configuration | DSN |
/// |---|---|
/// | `ssl_config.mode = disable` | `tls=false` |
/// | `ssl_config.mode = require` | `tls=true` |
/// | `ssl_config.mode = verify-ca / verify-full` | `tls=custom-tls-<host>-<port>` |
/// | `ssl_config` present, profile setup failed | no `tls` parameter |
/// | no `ssl_config`, `tls_skip_verify = true` | `tls=skip-verify` |
/// | otherwise | no `tls` parameter |
///
/// Extra parameters are merged after the security clause, so a `tls` key in
/// `jdbc_url_params` replaces the computed value. That is deliberate, but
/// it also silently overrides `ssl_config`. Parameter values are
/// percent-encoded and cannot introduce further parameters.
///
/// # Examples
///
/// ```
/// use secure_dsn::client::{ConnectionConfig, DsnBuilder};
/// use secure_dsn::connection::{SecurityConfig, SecurityMode, TlsRegistry};
///
/// let registry = TlsRegistry::new();
/// let config = ConnectionConfig::builder("db.internal")
///     .username("app")
///     .password("secret")
///     .database("orders")
///     .security(SecurityConfig::new(SecurityMode::Required))
///     .build();
///
/// let dsn = DsnBuilder::new(&registry).build(&config);
/// assert_eq!(dsn, "app:secret@tcp(db.internal:3306)/orders?tls=true");
/// ```
#[derive(Debug, Clone)]
pub struct DsnBuilder<'a> {
    registry: &'a TlsRegistry,
    profiles: TlsProfileBuilder,
}

impl<'a> DsnBuilder<'a> {
    /// Create a builder that publishes custom profiles into `registry`
    pub fn new(registry: &'a TlsRegistry) -> Self {
        Self {
            registry,
            profiles: TlsProfileBuilder::default(),
        }
    }

    /// Use a specific TLS profile builder (e.g. with another crypto provider)
    pub fn with_profile_builder(mut self, profiles: TlsProfileBuilder) -> Self {
        self.profiles = profiles;
        self
    }

    /// Build the DSN. Never fails.
    ///
    /// If the custom TLS profile cannot be built or registered, the DSN is
    /// produced without a `tls` parameter and a warning is logged. Use
    /// [`try_build`](Self::try_build) to get the error instead.
    pub fn build(&self, config: &ConnectionConfig) -> String {
        let tls = match self.security_clause(config) {
            Ok(tls) => tls,
            Err(e) => {
                let mode = config
                    .security
                    .as_ref()
                    .map(|s| s.mode)
                    .unwrap_or_default();
                tracing::warn!(
                    host = %config.effective_host(),
                    port = config.effective_port(),
                    mode = %mode,
                    error = %e,
                    "building DSN without tls parameter"
                );
                crate::metrics::counters::dsn_security_fallback(mode, e.category());
                None
            }
        };
        self.assemble(config, tls)
    }

    /// Build the DSN, returning profile build and registration failures.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if `ssl_config` has no mode
    /// * [`Error::Build`] if the certificate material cannot be loaded
    /// * [`Error::Register`] if the registry refuses the profile
    pub fn try_build(&self, config: &ConnectionConfig) -> Result<String> {
        let tls = self.security_clause(config)?;
        Ok(self.assemble(config, tls))
    }

    fn security_clause(&self, config: &ConnectionConfig) -> Result<Option<TlsParam>> {
        let security = match config.security {
            Some(ref security) => security,
            None if config.tls_skip_verify => return Ok(Some(TlsParam::SkipVerify)),
            None => return Ok(None),
        };

        match security.mode {
            SecurityMode::Disabled => Ok(Some(TlsParam::Disabled)),
            SecurityMode::Required => Ok(Some(TlsParam::Required)),
            SecurityMode::VerifyCa | SecurityMode::VerifyFull => {
                let name = config.tls_profile_name();
                let profile = self.profiles.build(security)?;
                self.registry.register(name.clone(), profile)?;
                Ok(Some(TlsParam::Named(name)))
            }
            SecurityMode::Unset => Err(Error::Validation(ValidationError::MissingMode)),
        }
    }

    fn assemble(&self, config: &ConnectionConfig, tls: Option<TlsParam>) -> String {
        let mut params = BTreeMap::new();
        if let Some(tls) = tls {
            params.insert(TLS_PARAM.to_string(), tls.to_string());
        }
        for (key, value) in &config.extra_params {
            params.insert(key.clone(), value.clone());
        }

        DsnInfo {
            user: config.username.clone(),
            password: (!config.password.is_empty()).then(|| config.password.clone()),
            net: "tcp".to_string(),
            addr: format_addr(config.effective_host(), config.effective_port()),
            database: config.database.clone(),
            params,
        }
        .to_string()
    }
}
