//! Declarative transport security settings and their required-field policy.

use crate::error::ValidationError;
use crate::Error;
use serde::{Deserialize, Serialize};

/// SSL/TLS connection mode, as written in the `ssl_config.mode` key.
///
/// Controls whether TLS is negotiated and how much of the server certificate is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityMode {
    /// No TLS (plaintext connection)
    #[serde(rename = "disable")]
    Disabled,
    /// TLS required, server certificate is not verified
    #[serde(rename = "require")]
    Required,
    /// TLS required, server certificate must chain to the configured CA
    #[serde(rename = "verify-ca")]
    VerifyCa,
    /// TLS required, certificate must chain to the configured CA and match the hostname
    #[serde(rename = "verify-full")]
    VerifyFull,
    /// Mode was not provided
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl SecurityMode {
    /// Whether this mode requires certificate verification (CA or full)
    pub fn requires_verification(&self) -> bool {
        matches!(self, Self::VerifyCa | Self::VerifyFull)
    }

    /// Text form used in configuration documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disable",
            Self::Required => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
            Self::Unset => "",
        }
    }
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecurityMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "disable" => Ok(Self::Disabled),
            "require" => Ok(Self::Required),
            "verify-ca" => Ok(Self::VerifyCa),
            "verify-full" => Ok(Self::VerifyFull),
            "" => Ok(Self::Unset),
            _ => Err(Error::Config(format!(
                "invalid ssl mode '{}': expected disable, require, verify-ca, or verify-full",
                s
            ))),
        }
    }
}

/// SSL configuration block of a connection document.
///
/// PEM material is carried inline as text. An absent field and an empty
/// string are treated the same way.
///
/// # Examples
///
/// ```
/// use secure_dsn::connection::{SecurityConfig, SecurityMode};
///
/// let ssl = SecurityConfig::new(SecurityMode::Required);
/// assert!(ssl.validate().is_ok());
///
/// let ssl = SecurityConfig::new(SecurityMode::VerifyCa);
/// assert!(ssl.validate().is_err());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// SSL mode
    #[serde(default)]
    pub mode: SecurityMode,
    /// CA certificate bundle (PEM)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_ca: String,
    /// Client certificate chain (PEM)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_cert: String,
    /// Client private key (PEM)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_key: String,
}

impl SecurityConfig {
    /// Create a configuration for `mode` without certificate material
    pub fn new(mode: SecurityMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the CA certificate bundle
    pub fn server_ca(mut self, pem: impl Into<String>) -> Self {
        self.server_ca = pem.into();
        self
    }

    /// Set the client certificate chain
    pub fn client_cert(mut self, pem: impl Into<String>) -> Self {
        self.client_cert = pem.into();
        self
    }

    /// Set the client private key
    pub fn client_key(mut self, pem: impl Into<String>) -> Self {
        self.client_key = pem.into();
        self
    }

    /// Check the required-field policy of the configured mode.
    ///
    /// `verify-ca` and `verify-full` need all three PEM fields. Only the first
    /// missing field is reported, checked in the order `server_ca`,
    /// `client_cert`, `client_key`.
    ///
    /// # Errors
    ///
    /// * [`ValidationError::MissingMode`] when the mode is unset
    /// * [`ValidationError::MissingField`] for the first empty required field
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        match self.mode {
            SecurityMode::Unset => Err(ValidationError::MissingMode),
            SecurityMode::Disabled | SecurityMode::Required => Ok(()),
            SecurityMode::VerifyCa | SecurityMode::VerifyFull => {
                let required = [
                    ("server_ca", &self.server_ca),
                    ("client_cert", &self.client_cert),
                    ("client_key", &self.client_key),
                ];
                match required.iter().find(|(_, value)| value.is_empty()) {
                    Some((field, _)) => Err(ValidationError::MissingField(*field)),
                    None => Ok(()),
                }
            }
        }
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.client_key.is_empty() {
            "<none>"
        } else {
            "<redacted>"
        };
        f.debug_struct("SecurityConfig")
            .field("mode", &self.mode)
            .field("server_ca_len", &self.server_ca.len())
            .field("client_cert_len", &self.client_cert.len())
            .field("client_key", &key)
            .finish()
    }
}
