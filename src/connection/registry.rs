//! Name-keyed store of TLS profiles.
//!
//! MySQL drivers select a custom TLS profile through the DSN `tls`
//! parameter, which only carries a name. The registry maps that name back to
//! a materialized [`TlsProfile`] when the driver opens the socket.

use super::tls::TlsProfile;
use crate::error::RegisterError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Values of the DSN `tls` parameter that have a fixed meaning and can never name a profile.
pub const RESERVED_PROFILE_NAMES: &[&str] =
    &["true", "false", "1", "0", "skip-verify", "preferred"];

static GLOBAL: OnceLock<TlsRegistry> = OnceLock::new();

/// What happens when a name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryPolicy {
    /// Last registration wins
    #[default]
    Replace,
    /// A name keeps its first profile; re-registering an identical profile is a no-op
    Immutable,
}

/// Thread-safe mapping from profile name to TLS profile.
///
/// Writes to the same name are serialized, and a completed
/// [`register`](Self::register) is visible to every later
/// [`get`](Self::get) on any thread.
///
/// # Examples
///
/// ```
/// use secure_dsn::connection::{SecurityConfig, SecurityMode, TlsProfile, TlsRegistry};
///
/// let registry = TlsRegistry::new();
/// let profile = TlsProfile::builder()
///     .build(&SecurityConfig::new(SecurityMode::Required))
///     .unwrap();
/// registry.register("custom-tls-db-3306", profile).unwrap();
/// assert!(registry.get("custom-tls-db-3306").is_some());
/// ```
#[derive(Debug, Default)]
pub struct TlsRegistry {
    profiles: RwLock<HashMap<String, Arc<TlsProfile>>>,
    policy: RegistryPolicy,
}

impl TlsRegistry {
    /// Create an empty registry that replaces entries on re-registration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given policy
    pub fn with_policy(policy: RegistryPolicy) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Process-wide registry, for drivers that cannot be handed a registry object.
    pub fn global() -> &'static TlsRegistry {
        GLOBAL.get_or_init(TlsRegistry::new)
    }

    /// Registration policy
    pub fn policy(&self) -> RegistryPolicy {
        self.policy
    }

    /// Register `profile` under `name` and return the shared entry.
    ///
    /// # Errors
    ///
    /// * [`RegisterError::EmptyName`] for an empty name
    /// * [`RegisterError::ReservedName`] if the name is a keyword of the
    ///   DSN `tls` parameter (case-insensitive)
    /// * [`RegisterError::RegistrationConflict`] if the registry is
    ///   [`Immutable`](RegistryPolicy::Immutable) and the name is bound to a
    ///   profile with a different fingerprint
    pub fn register(
        &self,
        name: impl Into<String>,
        profile: TlsProfile,
    ) -> Result<Arc<TlsProfile>, RegisterError> {
        let name = name.into();
        check_name(&name)?;

        let mut profiles = self.profiles.write();
        if let Some(existing) = profiles.get(&name) {
            if existing.fingerprint() == profile.fingerprint() {
                tracing::debug!(name = %name, "tls profile already registered");
                return Ok(existing.clone());
            }
            if self.policy == RegistryPolicy::Immutable {
                return Err(RegisterError::RegistrationConflict(name));
            }
            tracing::debug!(name = %name, "replacing registered tls profile");
        }

        let profile = Arc::new(profile);
        profiles.insert(name.clone(), profile.clone());
        drop(profiles);

        tracing::debug!(name = %name, mode = %profile.mode(), "tls profile registered");
        crate::metrics::counters::tls_profile_registered(profile.mode());
        Ok(profile)
    }

    /// Look up a profile by name
    pub fn get(&self, name: &str) -> Option<Arc<TlsProfile>> {
        self.profiles.read().get(name).cloned()
    }

    /// Whether a profile is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.read().contains_key(name)
    }

    /// Number of registered profiles
    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.profiles.write().clear();
    }
}

fn check_name(name: &str) -> Result<(), RegisterError> {
    if name.is_empty() {
        return Err(RegisterError::EmptyName);
    }
    if RESERVED_PROFILE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(RegisterError::ReservedName(name.to_string()));
    }
    Ok(())
}
