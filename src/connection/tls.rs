//! TLS profile materialization for secure MySQL connections.
//!
//! A [`TlsProfile`] is the driver-ready form of a validated
//! [`SecurityConfig`]: a compiled rustls `ClientConfig` plus the policy
//! that produced it, so callers can inspect what a registered profile does.

use super::security::{SecurityConfig, SecurityMode};
use crate::error::BuildError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use rustls::server::ParsedCertificate;
use rustls::{ClientConfig, DigitallySignedStruct, ProtocolVersion, RootCertStore, SignatureScheme};
use rustls_pemfile::Item;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Lowest protocol version any profile will negotiate.
pub const MIN_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::TLSv1_2;

static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// Materialized TLS settings for one connection target.
///
/// Immutable once built. Shared through [`TlsRegistry`](super::TlsRegistry)
/// as `Arc<TlsProfile>`.
#[derive(Clone)]
pub struct TlsProfile {
    mode: SecurityMode,
    roots: Arc<RootCertStore>,
    client_cert_chain: Vec<CertificateDer<'static>>,
    skip_peer_name_verification: bool,
    fingerprint: [u8; 32],
    client_config: Arc<ClientConfig>,
}

impl TlsProfile {
    /// Create a profile builder using the default crypto provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use secure_dsn::connection::{SecurityConfig, SecurityMode, TlsProfile};
    ///
    /// let profile = TlsProfile::builder()
    ///     .build(&SecurityConfig::new(SecurityMode::Required))
    ///     .unwrap();
    /// assert!(profile.skip_peer_name_verification());
    /// ```
    pub fn builder() -> TlsProfileBuilder {
        TlsProfileBuilder::default()
    }

    /// Mode this profile was built from
    pub fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Protocol version floor (always TLS 1.2)
    pub fn min_protocol_version(&self) -> ProtocolVersion {
        MIN_PROTOCOL_VERSION
    }

    /// Trust anchors parsed from the CA bundle (empty for `require`)
    pub fn roots(&self) -> Arc<RootCertStore> {
        self.roots.clone()
    }

    /// Number of trust anchors
    pub fn trust_anchor_count(&self) -> usize {
        self.roots.len()
    }

    /// Client certificate chain presented for mutual TLS, empty if none
    pub fn client_cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.client_cert_chain
    }

    /// Whether a client certificate is presented
    pub fn has_client_certificate(&self) -> bool {
        !self.client_cert_chain.is_empty()
    }

    /// Whether the server certificate's name is left unchecked.
    ///
    /// True for `verify-ca` and `require`, false for `verify-full`.
    pub fn skip_peer_name_verification(&self) -> bool {
        self.skip_peer_name_verification
    }

    /// SHA-256 over the mode, the trust anchors and the client certificate chain
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    /// Lowercase hex form of [`fingerprint`](Self::fingerprint)
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the rustls ClientConfig for this profile.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }
}

impl std::fmt::Debug for TlsProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsProfile")
            .field("mode", &self.mode)
            .field("min_protocol_version", &MIN_PROTOCOL_VERSION)
            .field("trust_anchors", &self.roots.len())
            .field("client_certificate", &self.has_client_certificate())
            .field(
                "skip_peer_name_verification",
                &self.skip_peer_name_verification,
            )
            .field("fingerprint", &self.fingerprint_hex())
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for TLS profiles.
///
/// Holds the crypto provider; the security settings come from the
/// [`SecurityConfig`] handed to [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TlsProfileBuilder {
    provider: Arc<CryptoProvider>,
}

impl Default for TlsProfileBuilder {
    fn default() -> Self {
        Self {
            provider: Arc::new(aws_lc_rs::default_provider()),
        }
    }
}

impl TlsProfileBuilder {
    /// Use a specific crypto provider instead of aws-lc-rs.
    pub fn with_provider(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Build a profile from a validated security config.
    ///
    /// Field presence is not re-checked here (see
    /// [`SecurityConfig::validate`]), but the PEM material is parsed.
    ///
    /// # Errors
    ///
    /// * [`BuildError::UnsupportedMode`] for `disable` and unset modes
    /// * [`BuildError::InvalidCa`] if no certificate in `server_ca` parses
    /// * [`BuildError::InvalidClientCredentials`] if the client certificate
    ///   and key cannot be loaded as a pair
    pub fn build(&self, config: &SecurityConfig) -> Result<TlsProfile, BuildError> {
        let result = self.materialize(config);
        match &result {
            Ok(profile) => {
                tracing::debug!(
                    mode = %config.mode,
                    trust_anchors = profile.trust_anchor_count(),
                    client_certificate = profile.has_client_certificate(),
                    "tls profile built"
                );
                crate::metrics::counters::tls_profile_built(config.mode);
            }
            Err(e) => {
                tracing::warn!(mode = %config.mode, error = %e, "failed to build tls profile");
                crate::metrics::counters::tls_profile_build_failed(config.mode, e.category());
            }
        }
        result
    }

    fn materialize(&self, config: &SecurityConfig) -> Result<TlsProfile, BuildError> {
        match config.mode {
            SecurityMode::VerifyCa | SecurityMode::VerifyFull => {
                let (roots, ca_certs) = load_ca_bundle(&config.server_ca)?;
                let roots = Arc::new(roots);
                let (chain, key) = load_client_identity(&config.client_cert, &config.client_key)?;

                let skip_peer_name = config.mode == SecurityMode::VerifyCa;
                let builder = if skip_peer_name {
                    self.config_builder()?
                        .dangerous()
                        .with_custom_certificate_verifier(Arc::new(SkipPeerNameVerifier {
                            roots: roots.clone(),
                            provider: self.provider.clone(),
                        }))
                } else {
                    let verifier = WebPkiServerVerifier::builder_with_provider(
                        roots.clone(),
                        self.provider.clone(),
                    )
                    .build()
                    .map_err(|e| BuildError::InvalidCa(e.to_string()))?;
                    self.config_builder()?.with_webpki_verifier(verifier)
                };

                let client_config = builder
                    .with_client_auth_cert(chain.clone(), key)
                    .map_err(|e| BuildError::InvalidClientCredentials(e.to_string()))?;

                let fingerprint = fingerprint(config.mode, &ca_certs, &chain);
                Ok(TlsProfile {
                    mode: config.mode,
                    roots,
                    client_cert_chain: chain,
                    skip_peer_name_verification: skip_peer_name,
                    fingerprint,
                    client_config: Arc::new(client_config),
                })
            }
            SecurityMode::Required => {
                // Encrypted but unauthenticated: no trust anchors, no name check.
                let client_config = self
                    .config_builder()?
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert {
                        provider: self.provider.clone(),
                    }))
                    .with_no_client_auth();

                Ok(TlsProfile {
                    mode: config.mode,
                    roots: Arc::new(RootCertStore::empty()),
                    client_cert_chain: Vec::new(),
                    skip_peer_name_verification: true,
                    fingerprint: fingerprint(config.mode, &[], &[]),
                    client_config: Arc::new(client_config),
                })
            }
            mode @ (SecurityMode::Disabled | SecurityMode::Unset) => {
                Err(BuildError::UnsupportedMode(mode))
            }
        }
    }

    fn config_builder(
        &self,
    ) -> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, BuildError> {
        Ok(ClientConfig::builder_with_provider(self.provider.clone())
            .with_protocol_versions(PROTOCOL_VERSIONS)?)
    }
}

/// Parse every certificate in a PEM bundle into a trust store.
///
/// Non-certificate sections are skipped. Fails only when nothing usable was found.
fn load_ca_bundle(
    pem: &str,
) -> Result<(RootCertStore, Vec<CertificateDer<'static>>), BuildError> {
    let mut reader = pem.as_bytes();
    let mut root_store = RootCertStore::empty();
    let mut accepted = Vec::new();
    let mut rejected = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                let (added, _) =
                    root_store.add_parsable_certificates(std::iter::once(cert.clone()));
                if added == 1 {
                    accepted.push(cert);
                } else {
                    rejected += 1;
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading CA bundle at malformed PEM section");
                break;
            }
        }
    }

    if root_store.is_empty() {
        let detail = if rejected > 0 {
            format!("{} certificate(s) in server_ca could not be parsed", rejected)
        } else {
            "no PEM certificates found in server_ca".to_string()
        };
        return Err(BuildError::InvalidCa(detail));
    }

    Ok((root_store, accepted))
}

/// Load the client certificate chain and its private key.
fn load_client_identity(
    cert_pem: &str,
    key_pem: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), BuildError> {
    let chain = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BuildError::InvalidClientCredentials(format!("client_cert: {}", e)))?;
    if chain.is_empty() {
        return Err(BuildError::InvalidClientCredentials(
            "no certificate found in client_cert".to_string(),
        ));
    }

    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(|e| BuildError::InvalidClientCredentials(format!("client_key: {}", e)))?
        .ok_or_else(|| {
            BuildError::InvalidClientCredentials("no private key found in client_key".to_string())
        })?;

    Ok((chain, key))
}

fn fingerprint(
    mode: SecurityMode,
    ca_certs: &[CertificateDer<'_>],
    client_chain: &[CertificateDer<'_>],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(mode.as_str().as_bytes());
    for cert in ca_certs {
        hasher.update(b"\0ca\0");
        hasher.update(cert.as_ref());
    }
    for cert in client_chain {
        hasher.update(b"\0client\0");
        hasher.update(cert.as_ref());
    }
    hasher.finalize().into()
}

/// `verify-ca`: the chain must lead to a configured trust anchor, the server name is not checked.
#[derive(Debug)]
struct SkipPeerNameVerifier {
    roots: Arc<RootCertStore>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for SkipPeerNameVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;
        rustls::client::verify_server_cert_signed_by_trust_anchor(
            &cert,
            &self.roots,
            intermediates,
            now,
            self.provider.signature_verification_algorithms.all,
        )?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// `require`: any server certificate is accepted. Handshake signatures are still checked.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const CA_PEM: &str = include_str!("../../tests/fixtures/ca.pem");
    const CLIENT_CERT_PEM: &str = include_str!("../../tests/fixtures/client.pem");
    const CLIENT_KEY_PEM: &str = include_str!("../../tests/fixtures/client.key");
    const SERVER_CERT_PEM: &str = include_str!("../../tests/fixtures/server.pem");
    const ROGUE_CERT_PEM: &str = include_str!("../../tests/fixtures/rogue.pem");

    fn mtls(mode: SecurityMode) -> SecurityConfig {
        SecurityConfig::new(mode)
            .server_ca(CA_PEM)
            .client_cert(CLIENT_CERT_PEM)
            .client_key(CLIENT_KEY_PEM)
    }

    fn first_cert(pem: &str) -> CertificateDer<'static> {
        rustls_pemfile::certs(&mut pem.as_bytes())
            .next()
            .expect("fixture has a certificate")
            .expect("fixture certificate parses")
    }

    // 2030-01-01, inside the validity window of every fixture
    fn fixture_time() -> UnixTime {
        UnixTime::since_unix_epoch(Duration::from_secs(1_893_456_000))
    }

    #[test]
    fn test_verify_ca_profile() {
        let profile = TlsProfile::builder()
            .build(&mtls(SecurityMode::VerifyCa))
            .expect("verify-ca profile");

        assert_eq!(profile.mode(), SecurityMode::VerifyCa);
        assert_eq!(profile.min_protocol_version(), ProtocolVersion::TLSv1_2);
        assert_eq!(profile.trust_anchor_count(), 1);
        assert!(profile.has_client_certificate());
        assert!(profile.skip_peer_name_verification());
    }

    #[test]
    fn test_verify_full_differs_only_in_name_check() {
        let builder = TlsProfile::builder();
        let ca = builder.build(&mtls(SecurityMode::VerifyCa)).unwrap();
        let full = builder.build(&mtls(SecurityMode::VerifyFull)).unwrap();

        assert!(ca.skip_peer_name_verification());
        assert!(!full.skip_peer_name_verification());

        assert_eq!(ca.min_protocol_version(), full.min_protocol_version());
        assert_eq!(ca.trust_anchor_count(), full.trust_anchor_count());
        assert_eq!(ca.client_cert_chain(), full.client_cert_chain());
    }

    #[test]
    fn test_required_profile_is_unauthenticated() {
        let profile = TlsProfile::builder()
            .build(&SecurityConfig::new(SecurityMode::Required))
            .unwrap();

        assert_eq!(profile.trust_anchor_count(), 0);
        assert!(!profile.has_client_certificate());
        assert!(profile.skip_peer_name_verification());
    }

    #[test]
    fn test_required_ignores_certificate_fields() {
        let profile = TlsProfile::builder()
            .build(&mtls(SecurityMode::Required))
            .unwrap();
        assert_eq!(profile.trust_anchor_count(), 0);
        assert!(!profile.has_client_certificate());
    }

    #[test]
    fn test_disabled_and_unset_are_not_buildable() {
        let builder = TlsProfile::builder();
        assert!(matches!(
            builder.build(&SecurityConfig::new(SecurityMode::Disabled)),
            Err(BuildError::UnsupportedMode(SecurityMode::Disabled))
        ));
        assert!(matches!(
            builder.build(&SecurityConfig::default()),
            Err(BuildError::UnsupportedMode(SecurityMode::Unset))
        ));
    }

    #[test]
    fn test_invalid_ca_text() {
        let cfg = mtls(SecurityMode::VerifyFull).server_ca("ca-cert");
        let err = TlsProfile::builder().build(&cfg).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCa(_)));
    }

    #[test]
    fn test_ca_bundle_with_only_a_key_is_invalid() {
        let cfg = mtls(SecurityMode::VerifyCa).server_ca(CLIENT_KEY_PEM);
        let err = TlsProfile::builder().build(&cfg).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCa(_)));
    }

    #[test]
    fn test_ca_bundle_skips_non_certificate_sections() {
        let bundle = format!("{}{}", CLIENT_KEY_PEM, CA_PEM);
        let cfg = mtls(SecurityMode::VerifyCa).server_ca(bundle);
        let profile = TlsProfile::builder().build(&cfg).unwrap();
        assert_eq!(profile.trust_anchor_count(), 1);
    }

    #[test]
    fn test_ca_bundle_with_multiple_certificates() {
        let bundle = format!("{}{}", CA_PEM, ROGUE_CERT_PEM);
        let cfg = mtls(SecurityMode::VerifyFull).server_ca(bundle);
        let profile = TlsProfile::builder().build(&cfg).unwrap();
        assert_eq!(profile.trust_anchor_count(), 2);
    }

    #[test]
    fn test_invalid_client_certificate() {
        let cfg = mtls(SecurityMode::VerifyCa).client_cert("client-cert");
        let err = TlsProfile::builder().build(&cfg).unwrap_err();
        match err {
            BuildError::InvalidClientCredentials(detail) => {
                assert!(detail.contains("client_cert"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_client_key() {
        let cfg = mtls(SecurityMode::VerifyFull).client_key("client-key");
        let err = TlsProfile::builder().build(&cfg).unwrap_err();
        match err {
            BuildError::InvalidClientCredentials(detail) => {
                assert!(detail.contains("client_key"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ca_is_checked_before_client_credentials() {
        let cfg = SecurityConfig::new(SecurityMode::VerifyCa)
            .server_ca("ca-cert")
            .client_cert("client-cert")
            .client_key("client-key");
        let err = TlsProfile::builder().build(&cfg).unwrap_err();
        assert!(matches!(err, BuildError::InvalidCa(_)));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let builder = TlsProfile::builder();
        let a = builder.build(&mtls(SecurityMode::VerifyFull)).unwrap();
        let b = builder.build(&mtls(SecurityMode::VerifyFull)).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint_hex().len(), 64);

        let c = builder.build(&mtls(SecurityMode::VerifyCa)).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_skip_peer_name_verifier_accepts_any_name() {
        let verifier = SkipPeerNameVerifier {
            roots: Arc::new(load_ca_bundle(CA_PEM).unwrap().0),
            provider: Arc::new(aws_lc_rs::default_provider()),
        };
        let server = first_cert(SERVER_CERT_PEM);

        for name in ["db.internal", "replica-7.example.com"] {
            let server_name = ServerName::try_from(name).unwrap();
            let result =
                verifier.verify_server_cert(&server, &[], &server_name, &[], fixture_time());
            assert!(result.is_ok(), "name {} rejected: {:?}", name, result);
        }
    }

    #[test]
    fn test_skip_peer_name_verifier_still_checks_chain() {
        let verifier = SkipPeerNameVerifier {
            roots: Arc::new(load_ca_bundle(CA_PEM).unwrap().0),
            provider: Arc::new(aws_lc_rs::default_provider()),
        };
        let rogue = first_cert(ROGUE_CERT_PEM);
        let server_name = ServerName::try_from("db.internal").unwrap();

        let result = verifier.verify_server_cert(&rogue, &[], &server_name, &[], fixture_time());
        assert!(result.is_err());
    }

    #[test]
    fn test_accept_any_server_cert() {
        let verifier = AcceptAnyServerCert {
            provider: Arc::new(aws_lc_rs::default_provider()),
        };
        let rogue = first_cert(ROGUE_CERT_PEM);
        let server_name = ServerName::try_from("anything.example").unwrap();

        assert!(verifier
            .verify_server_cert(&rogue, &[], &server_name, &[], fixture_time())
            .is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[test]
    fn test_tls_profile_debug() {
        let profile = TlsProfile::builder()
            .build(&mtls(SecurityMode::VerifyFull))
            .unwrap();

        let debug_str = format!("{:?}", profile);
        assert!(debug_str.contains("TlsProfile"));
        assert!(debug_str.contains("skip_peer_name_verification"));
        assert!(!debug_str.contains("PRIVATE KEY"));
    }
}
