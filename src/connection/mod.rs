//! Connection security
//!
//! This module handles:
//! * SSL mode and certificate material (`ssl_config`)
//! * Required-field validation per mode
//! * TLS profile materialization (rustls)
//! * Name-keyed profile registry consulted by the driver at connect time

mod registry;
mod security;
mod tls;

pub use registry::{RegistryPolicy, TlsRegistry, RESERVED_PROFILE_NAMES};
pub use security::{SecurityConfig, SecurityMode};
pub use tls::{TlsProfile, TlsProfileBuilder, MIN_PROTOCOL_VERSION};
