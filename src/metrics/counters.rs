//! Counter helpers

use super::labels;
use crate::connection::SecurityMode;

/// Record a successfully built TLS profile
pub fn tls_profile_built(mode: SecurityMode) {
    metrics::counter!(labels::TLS_PROFILES_BUILT, labels::MODE => mode.as_str()).increment(1);
}

/// Record a failed TLS profile build
pub fn tls_profile_build_failed(mode: SecurityMode, reason: &'static str) {
    metrics::counter!(
        labels::TLS_PROFILE_BUILD_FAILURES,
        labels::MODE => mode.as_str(),
        labels::REASON => reason
    )
    .increment(1);
}

/// Record a profile written into a registry
pub fn tls_profile_registered(mode: SecurityMode) {
    metrics::counter!(labels::TLS_PROFILES_REGISTERED, labels::MODE => mode.as_str()).increment(1);
}

/// Record a DSN emitted without its security clause
pub fn dsn_security_fallback(mode: SecurityMode, reason: &'static str) {
    metrics::counter!(
        labels::DSN_SECURITY_FALLBACKS,
        labels::MODE => mode.as_str(),
        labels::REASON => reason
    )
    .increment(1);
}
