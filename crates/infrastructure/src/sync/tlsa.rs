//! TLSA (RFC 6698) certificate association checks.

use music_domain::{MusicError, TlsaData};
use sha2::{Digest, Sha256, Sha512};
use x509_parser::prelude::*;

/// TLSA certificate usages accepted for peer sidecars. Both pin the end
/// entity certificate; PKIX-constrained variants behave identically here
/// because no public CA chain is consulted.
const USAGE_PKIX_EE: u8 = 1;
const USAGE_DANE_EE: u8 = 3;

const SELECTOR_FULL_CERT: u8 = 0;
const SELECTOR_SPKI: u8 = 1;

const MATCHING_EXACT: u8 = 0;
const MATCHING_SHA256: u8 = 1;
const MATCHING_SHA512: u8 = 2;

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

fn selected_data(cert_der: &[u8], selector: u8) -> Result<Vec<u8>, MusicError> {
    match selector {
        SELECTOR_FULL_CERT => Ok(cert_der.to_vec()),
        SELECTOR_SPKI => {
            let (_, cert) = X509Certificate::from_der(cert_der)
                .map_err(|e| MusicError::PeerVerification {
                    identity: String::new(),
                    detail: format!("cannot parse certificate: {}", e),
                })?;
            Ok(cert.tbs_certificate.subject_pki.raw.to_vec())
        }
        other => Err(MusicError::PeerVerification {
            identity: String::new(),
            detail: format!("unsupported TLSA selector {}", other),
        }),
    }
}

/// Check one certificate against one TLSA record.
pub fn verify_cert(cert_der: &[u8], tlsa: &TlsaData) -> Result<bool, MusicError> {
    if tlsa.usage != USAGE_PKIX_EE && tlsa.usage != USAGE_DANE_EE {
        return Err(MusicError::PeerVerification {
            identity: String::new(),
            detail: format!("unsupported TLSA usage {}", tlsa.usage),
        });
    }

    let selected = selected_data(cert_der, tlsa.selector)?;
    let computed = match tlsa.matching_type {
        MATCHING_EXACT => hex_encode(&selected),
        MATCHING_SHA256 => hex_encode(&Sha256::digest(&selected)),
        MATCHING_SHA512 => hex_encode(&Sha512::digest(&selected)),
        other => {
            return Err(MusicError::PeerVerification {
                identity: String::new(),
                detail: format!("unsupported TLSA matching type {}", other),
            })
        }
    };

    Ok(computed == tlsa.cert_data.to_lowercase())
}

/// The TLSA record a sidecar publishes for its own certificate:
/// DANE-EE, SPKI, SHA-256.
pub fn tlsa_for_cert(cert_der: &[u8]) -> Result<TlsaData, MusicError> {
    let spki = selected_data(cert_der, SELECTOR_SPKI)?;
    Ok(TlsaData {
        usage: USAGE_DANE_EE,
        selector: SELECTOR_SPKI,
        matching_type: MATCHING_SHA256,
        cert_data: hex_encode(&Sha256::digest(&spki)),
    })
}

/// The subject CN of a client certificate, used to map a presented
/// certificate back to a peer identity.
pub fn subject_common_name(cert_der: &[u8]) -> Result<Option<String>, MusicError> {
    let (_, cert) =
        X509Certificate::from_der(cert_der).map_err(|e| MusicError::PeerVerification {
            identity: String::new(),
            detail: format!("cannot parse client certificate: {}", e),
        })?;
    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    Ok(cn)
}
