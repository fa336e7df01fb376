//! rustls glue for TLSA-pinned peer connections.
//!
//! Outbound: the server certificate is validated against the peer's
//! DNSSEC-published TLSA record instead of a CA chain. Inbound: client
//! certificates are accepted at the handshake and checked against the
//! membership (CN + TLSA) per request.

use music_domain::{MusicError, TlsaData};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{ClientConfig, DigitallySignedStruct, DistinguishedName, ServerConfig};
use std::sync::Arc;

use super::tlsa;

fn supported_algorithms() -> WebPkiSupportedAlgorithms {
    rustls::crypto::ring::default_provider().signature_verification_algorithms
}

/// Validates the server's end-entity certificate against one TLSA
/// record; no CA chain is consulted.
#[derive(Debug)]
pub struct TlsaCertVerifier {
    tlsa: TlsaData,
    algorithms: WebPkiSupportedAlgorithms,
}

impl TlsaCertVerifier {
    pub fn new(tlsa: TlsaData) -> Self {
        Self {
            tlsa,
            algorithms: supported_algorithms(),
        }
    }
}

impl ServerCertVerifier for TlsaCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match tlsa::verify_cert(end_entity.as_ref(), &self.tlsa) {
            Ok(true) => Ok(ServerCertVerified::assertion()),
            _ => Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            )),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Accepts any presented client certificate at the handshake; the sync
/// handlers check CN and TLSA against the membership afterwards, which
/// is where "known peer" can actually be decided.
#[derive(Debug)]
struct DeferredClientCertVerifier {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ClientCertVerifier for DeferredClientCertVerifier {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        false
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, MusicError> {
    let pem = std::fs::read(path)
        .map_err(|e| MusicError::Config(format!("cannot read certificate {}: {}", path, e)))?;
    rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MusicError::Config(format!("cannot parse certificate {}: {}", path, e)))
}

pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, MusicError> {
    let pem = std::fs::read(path)
        .map_err(|e| MusicError::Config(format!("cannot read key {}: {}", path, e)))?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|e| MusicError::Config(format!("cannot parse key {}: {}", path, e)))?
        .ok_or_else(|| MusicError::Config(format!("no private key in {}", path)))
}

/// Client config for one peer: server cert pinned by TLSA, our own
/// certificate presented for the peer's CN check.
pub fn client_config_for_peer(
    tlsa: &TlsaData,
    identity_certs: Vec<CertificateDer<'static>>,
    identity_key: PrivateKeyDer<'static>,
) -> Result<ClientConfig, MusicError> {
    ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(TlsaCertVerifier::new(tlsa.clone())))
        .with_client_auth_cert(identity_certs, identity_key)
        .map_err(|e| MusicError::Config(format!("client TLS config: {}", e)))
}

/// Server config for the sync listener: our certificate, client certs
/// requested but validated per request.
pub fn sync_server_config(cert_path: &str, key_path: &str) -> Result<ServerConfig, MusicError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    ServerConfig::builder()
        .with_client_cert_verifier(Arc::new(DeferredClientCertVerifier {
            algorithms: supported_algorithms(),
        }))
        .with_single_cert(certs, key)
        .map_err(|e| MusicError::Config(format!("server TLS config: {}", e)))
}
