//! Metric names and label keys

/// TLS profiles successfully built
pub const TLS_PROFILES_BUILT: &str = "secure_dsn_tls_profiles_built_total";
/// TLS profile builds that failed
pub const TLS_PROFILE_BUILD_FAILURES: &str = "secure_dsn_tls_profile_build_failures_total";
/// Profiles written into a registry
pub const TLS_PROFILES_REGISTERED: &str = "secure_dsn_tls_profiles_registered_total";
/// DSNs built without a security clause because the profile could not be set up
pub const DSN_SECURITY_FALLBACKS: &str = "secure_dsn_dsn_security_fallbacks_total";

/// SSL mode label key
pub const MODE: &str = "mode";
/// Failure reason label key
pub const REASON: &str = "reason";
