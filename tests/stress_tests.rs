//! Stress testing suite for the TLS registry
//!
//! Many configurations build DSNs at once from independent threads, the way
//! a connector with several sources starts up.
//!
//! Run with: cargo test --test stress_tests -- --nocapture

use secure_dsn::client::{ConnectionConfig, DsnInfo};
use secure_dsn::connection::{SecurityConfig, SecurityMode, TlsRegistry};
use std::sync::{Arc, Barrier};
use std::thread;

const CA_PEM: &str = include_str!("fixtures/ca.pem");
const CLIENT_CERT_PEM: &str = include_str!("fixtures/client.pem");
const CLIENT_KEY_PEM: &str = include_str!("fixtures/client.key");

fn source(host: &str, mode: SecurityMode) -> ConnectionConfig {
    ConnectionConfig::builder(host)
        .port(3306)
        .username("replicator")
        .password("secret")
        .security(
            SecurityConfig::new(mode)
                .server_ca(CA_PEM)
                .client_cert(CLIENT_CERT_PEM)
                .client_key(CLIENT_KEY_PEM),
        )
        .build()
}

/// Distinct sources registering concurrently all stay resolvable
#[test]
fn test_stress_concurrent_distinct_sources() {
    const SOURCES: usize = 16;

    let registry = Arc::new(TlsRegistry::new());
    let barrier = Arc::new(Barrier::new(SOURCES));

    let handles: Vec<_> = (0..SOURCES)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let config = source(&format!("shard{}.internal", i), SecurityMode::VerifyFull);
                barrier.wait();
                let dsn = config.dsn(&registry).expect("dsn");

                // Registration happens-before the lookup on this thread
                let tls = DsnInfo::parse(&dsn).unwrap().tls().expect("tls parameter");
                assert!(tls.resolve(&registry).unwrap().is_some());
                dsn
            })
        })
        .collect();

    let dsns: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().expect("source thread panicked"))
        .collect();

    assert_eq!(registry.len(), SOURCES);
    for (i, dsn) in dsns.iter().enumerate() {
        assert!(dsn.contains(&format!("tls=custom-tls-shard{}.internal-3306", i)));
    }
}

/// Sources sharing host and port collide on one name; the last registration wins
#[test]
fn test_stress_same_target_last_registration_wins() {
    const ROUNDS: usize = 32;

    let registry = Arc::new(TlsRegistry::new());
    let handles: Vec<_> = (0..ROUNDS)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || {
                let mode = if i % 2 == 0 {
                    SecurityMode::VerifyCa
                } else {
                    SecurityMode::VerifyFull
                };
                source("primary.internal", mode)
                    .dsn(&registry)
                    .expect("dsn")
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("source thread panicked");
    }

    assert_eq!(registry.len(), 1);
    let profile = registry
        .get("custom-tls-primary.internal-3306")
        .expect("profile registered");
    assert!(profile.mode().requires_verification());
    assert_eq!(
        profile.skip_peer_name_verification(),
        profile.mode() == SecurityMode::VerifyCa
    );
}

/// Readers never observe a missing entry once it has been registered
#[test]
fn test_stress_readers_during_registration() {
    let registry = Arc::new(TlsRegistry::new());
    source("primary.internal", SecurityMode::VerifyCa)
        .dsn(&registry)
        .expect("initial dsn");

    let writer = {
        let registry = registry.clone();
        thread::spawn(move || {
            for i in 0..50 {
                let mode = if i % 2 == 0 {
                    SecurityMode::VerifyFull
                } else {
                    SecurityMode::VerifyCa
                };
                source("primary.internal", mode)
                    .dsn(&registry)
                    .expect("dsn");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    assert!(registry.get("custom-tls-primary.internal-3306").is_some());
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
}
