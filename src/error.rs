//! Error types

use crate::connection::SecurityMode;
use std::io;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Security configuration is incomplete for its mode
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Security configuration rejected while validating the outer connection config
    #[error("invalid SSL configuration: {0}")]
    InvalidSecurity(#[source] ValidationError),

    /// TLS profile could not be materialized
    #[error("tls profile error: {0}")]
    Build(#[from] BuildError),

    /// TLS profile could not be published under its name
    #[error("tls registry error: {0}")]
    Register(#[from] RegisterError),

    /// Invalid connection configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while reading configuration
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON configuration document
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Required-field failures for a [`SecurityConfig`](crate::connection::SecurityConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `mode` was not provided
    #[error("'ssl.mode' is required")]
    MissingMode,

    /// A field required by the selected mode is empty
    #[error("'ssl.{0}' is required")]
    MissingField(&'static str),
}

/// Failures while turning a validated security config into a TLS profile.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The mode has no TLS profile (disabled or unset)
    #[error("no tls profile for ssl mode '{0}'")]
    UnsupportedMode(SecurityMode),

    /// No certificate in the CA bundle could be parsed
    #[error("failed to load server CA certificate: {0}")]
    InvalidCa(String),

    /// Client certificate and key do not form a usable key pair
    #[error("failed to load client certificate and key: {0}")]
    InvalidClientCredentials(String),

    /// rustls refused the assembled configuration
    #[error("tls configuration rejected: {0}")]
    Tls(#[from] rustls::Error),
}

/// Failures while publishing a TLS profile in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Profile names must be non-empty
    #[error("tls profile name is empty")]
    EmptyName,

    /// Name collides with a keyword of the DSN `tls` parameter
    #[error("tls profile name '{0}' is reserved")]
    ReservedName(String),

    /// Name is already bound to a different profile in an immutable registry
    #[error("tls profile '{0}' is already registered with different settings")]
    RegistrationConflict(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if error is a security validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InvalidSecurity(_))
    }

    /// Check if error came from certificate or key parsing
    pub fn is_certificate_error(&self) -> bool {
        matches!(
            self,
            Error::Build(BuildError::InvalidCa(_) | BuildError::InvalidClientCredentials(_))
        )
    }

    /// Short category label, used as a metric label value
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation(_) | Error::InvalidSecurity(_) => "validation",
            Error::Build(e) => e.category(),
            Error::Register(_) => "register",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

impl BuildError {
    /// Short category label, used as a metric label value
    pub fn category(&self) -> &'static str {
        match self {
            BuildError::UnsupportedMode(_) => "unsupported_mode",
            BuildError::InvalidCa(_) => "invalid_ca",
            BuildError::InvalidClientCredentials(_) => "invalid_client_credentials",
            BuildError::Tls(_) => "tls",
        }
    }
}
