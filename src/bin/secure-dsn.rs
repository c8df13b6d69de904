//! Print the DSN for a JSON connection document.
//!
//! Usage: secure-dsn <config.json> [--lossy]
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use secure_dsn::client::{ConnectionConfig, DsnInfo};
use secure_dsn::connection::TlsRegistry;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: secure-dsn <config.json> [--lossy]");
        return ExitCode::from(2);
    };
    let lossy = args.any(|arg| arg == "--lossy");

    match run(&path, lossy) {
        Ok(dsn) => {
            println!("{}", dsn);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "failed to build DSN");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str, lossy: bool) -> secure_dsn::Result<String> {
    let config = ConnectionConfig::from_path(path)?;
    let registry = TlsRegistry::global();

    let dsn = if lossy {
        config.dsn_lossy(registry)
    } else {
        config.dsn(registry)?
    };

    if let Some(tls) = DsnInfo::parse(&dsn).ok().and_then(|info| info.tls()) {
        match tls.resolve(registry)? {
            Some(profile) => tracing::info!(
                tls = %tls,
                mode = %profile.mode(),
                fingerprint = %profile.fingerprint_hex(),
                "custom tls profile registered"
            ),
            None => tracing::info!(tls = %tls, "tls parameter set"),
        }
    }

    Ok(dsn)
}
