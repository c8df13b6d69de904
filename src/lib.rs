//! secure-dsn: TLS profiles and DSNs for MySQL-family sources
//!
//! Turns an `ssl_config` block (`disable`, `require`, `verify-ca`,
//! `verify-full`, plus optional mutual-TLS PEM material) into
//!
//! * a validated [`TlsProfile`](connection::TlsProfile) backed by a rustls
//!   `ClientConfig`, published by name in a [`TlsRegistry`](connection::TlsRegistry), and
//! * a go-sql-driver style DSN whose `tls` parameter selects that profile.
//!
//! No sockets are opened here; the driver resolves the DSN's profile name
//! through the registry when it connects.
//!
//! # Example
//!
//! ```
//! use secure_dsn::client::ConnectionConfig;
//! use secure_dsn::connection::TlsRegistry;
//!
//! # fn main() -> secure_dsn::Result<()> {
//! let config = ConnectionConfig::from_json(r#"{
//!     "host": "db.internal",
//!     "port": 3306,
//!     "username": "replicator",
//!     "password": "secret",
//!     "ssl_config": {"mode": "require"}
//! }"#)?;
//!
//! let registry = TlsRegistry::new();
//! let dsn = config.dsn(&registry)?;
//! assert_eq!(dsn, "replicator:secret@tcp(db.internal:3306)/mysql?tls=true");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod connection;
pub mod error;
pub mod metrics;

pub use error::{BuildError, Error, RegisterError, Result, ValidationError};
