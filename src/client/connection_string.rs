//! MySQL DSN parsing and formatting
//!
//! Supports the go-sql-driver format:
//! * [user[:password]@][net[(addr)]]/[database][?param1=value1&paramN=valueN]
//!
//! Parameter values are percent-encoded when formatting and decoded when
//! parsing (`+` decodes to a space), so a value can carry `&`, `/` or `=`.
//! Keys, credentials and the address are kept verbatim.

use crate::connection::{TlsProfile, TlsRegistry};
use crate::{Error, Result};
use percent_encoding::{
    percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// DSN parameter carrying the TLS selection
pub const TLS_PARAM: &str = "tls";

/// Characters escaped in parameter values: everything except unreserved ones
const PARAM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Value of the DSN `tls` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsParam {
    /// `tls=false`: plaintext
    Disabled,
    /// `tls=true`: encrypted, server certificate not authenticated
    Required,
    /// `tls=skip-verify`: encrypted, no verification (legacy switch)
    SkipVerify,
    /// `tls=preferred`: encrypt if the server offers it
    Preferred,
    /// `tls=<name>`: custom profile looked up in a [`TlsRegistry`]
    Named(String),
}

impl TlsParam {
    /// Resolve the profile a driver should use for this parameter.
    ///
    /// Only [`TlsParam::Named`] refers to a registered profile; the keyword
    /// forms return `None` and leave the TLS setup to the driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a named profile is not registered.
    pub fn resolve(&self, registry: &TlsRegistry) -> Result<Option<Arc<TlsProfile>>> {
        match self {
            TlsParam::Named(name) => registry
                .get(name)
                .map(Some)
                .ok_or_else(|| Error::Config(format!("tls profile '{}' is not registered", name))),
            _ => Ok(None),
        }
    }
}

impl From<&str> for TlsParam {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "false" | "0" => TlsParam::Disabled,
            "true" | "1" => TlsParam::Required,
            "skip-verify" => TlsParam::SkipVerify,
            "preferred" => TlsParam::Preferred,
            _ => TlsParam::Named(value.to_string()),
        }
    }
}

impl fmt::Display for TlsParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsParam::Disabled => f.write_str("false"),
            TlsParam::Required => f.write_str("true"),
            TlsParam::SkipVerify => f.write_str("skip-verify"),
            TlsParam::Preferred => f.write_str("preferred"),
            TlsParam::Named(name) => f.write_str(name),
        }
    }
}

/// Parsed DSN
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DsnInfo {
    /// Username (may be empty)
    pub user: String,
    /// Password
    pub password: Option<String>,
    /// Network type, e.g. `tcp` (may be empty)
    pub net: String,
    /// Network address, e.g. `localhost:3306`
    pub addr: String,
    /// Database name (may be empty)
    pub database: String,
    /// Parameters, sorted by key
    pub params: BTreeMap<String, String>,
}

/// Join host and port, bracketing IPv6 literals
pub fn format_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

impl DsnInfo {
    /// Parse a DSN string
    pub fn parse(s: &str) -> Result<Self> {
        // The database name starts after the last slash.
        let slash = s.rfind('/').ok_or_else(|| {
            Error::Config("invalid DSN: missing the slash separating the database name".into())
        })?;
        let (head, tail) = (&s[..slash], &s[slash + 1..]);

        let (user, password, net_addr) = match head.rfind('@') {
            Some(pos) => {
                let auth = &head[..pos];
                let (user, password) = match auth.split_once(':') {
                    Some((user, pass)) => (user.to_string(), Some(pass.to_string())),
                    None => (auth.to_string(), None),
                };
                (user, password, &head[pos + 1..])
            }
            None => (String::new(), None, head),
        };

        let (net, addr) = match net_addr.find('(') {
            Some(pos) => {
                let addr = net_addr[pos + 1..].strip_suffix(')').ok_or_else(|| {
                    Error::Config(
                        "invalid DSN: network address not terminated (missing closing brace)"
                            .into(),
                    )
                })?;
                (net_addr[..pos].to_string(), addr.to_string())
            }
            None => (net_addr.to_string(), String::new()),
        };

        let (database, query) = match tail.split_once('?') {
            Some((db, q)) => (db.to_string(), q),
            None => (tail.to_string(), ""),
        };

        let mut params = BTreeMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid DSN: invalid parameter '{}'", pair))
            })?;
            params.insert(key.to_string(), decode_param_value(value)?);
        }

        Ok(Self {
            user,
            password,
            net,
            addr,
            database,
            params,
        })
    }

    /// Parameter value by key
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The `tls` parameter, if present
    pub fn tls(&self) -> Option<TlsParam> {
        self.param(TLS_PARAM).map(TlsParam::from)
    }
}

fn decode_param_value(value: &str) -> Result<String> {
    let value = value.replace('+', " ");
    percent_decode_str(&value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| {
            Error::Config(format!(
                "invalid DSN: invalid parameter value '{}': {}",
                value, e
            ))
        })
}

impl fmt::Display for DsnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.user.is_empty() || self.password.is_some() {
            f.write_str(&self.user)?;
            if let Some(ref password) = self.password {
                write!(f, ":{}", password)?;
            }
            f.write_str("@")?;
        }

        if !self.net.is_empty() {
            f.write_str(&self.net)?;
            if !self.addr.is_empty() {
                write!(f, "({})", self.addr)?;
            }
        }

        write!(f, "/{}", self.database)?;

        let mut separator = '?';
        for (key, value) in &self.params {
            write!(
                f,
                "{}{}={}",
                separator,
                key,
                utf8_percent_encode(value, PARAM_VALUE)
            )?;
            separator = '&';
        }
        Ok(())
    }
}
