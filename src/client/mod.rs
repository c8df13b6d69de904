//! Connection configuration and DSN handling
//!
//! This module handles:
//! * The JSON connection document and its defaults
//! * DSN assembly with the TLS clause chosen from `ssl_config`
//! * DSN parsing and named TLS profile lookup for the driver side

mod config;
mod connection_string;
mod dsn;

pub use config::{
    ConnectionConfig, ConnectionConfigBuilder, UpdateMethod, DEFAULT_DATABASE, DEFAULT_HOST,
    DEFAULT_MAX_THREADS, DEFAULT_PORT, DEFAULT_RETRY_COUNT,
};
pub use connection_string::{format_addr, DsnInfo, TlsParam, TLS_PARAM};
pub use dsn::DsnBuilder;
