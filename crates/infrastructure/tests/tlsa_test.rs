//! TLSA matching against real (self-signed) certificates.

use music_domain::{MusicError, TlsaData};
use music_infrastructure::sync::tlsa::{subject_common_name, tlsa_for_cert, verify_cert};
use rcgen::{CertificateParams, KeyPair};

fn self_signed(cn: &str) -> Vec<u8> {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(vec![cn.trim_end_matches('.').to_string()]).unwrap();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, cn.trim_end_matches('.'));
    let cert = params.self_signed(&key).unwrap();
    cert.der().to_vec()
}

#[test]
fn own_tlsa_verifies() {
    let cert = self_signed("msa1.example.");
    let tlsa = tlsa_for_cert(&cert).unwrap();
    assert_eq!(tlsa.usage, 3);
    assert_eq!(tlsa.selector, 1);
    assert_eq!(tlsa.matching_type, 1);
    assert!(verify_cert(&cert, &tlsa).unwrap());
}

#[test]
fn mismatched_cert_fails_verification() {
    let cert = self_signed("msa1.example.");
    let other = self_signed("msa2.example.");
    let tlsa = tlsa_for_cert(&cert).unwrap();
    assert!(!verify_cert(&other, &tlsa).unwrap());
}

#[test]
fn tampered_digest_fails_verification() {
    let cert = self_signed("msa1.example.");
    let mut tlsa = tlsa_for_cert(&cert).unwrap();
    tlsa.cert_data = "00".repeat(32);
    assert!(!verify_cert(&cert, &tlsa).unwrap());
}

#[test]
fn full_cert_exact_match() {
    let cert = self_signed("msa1.example.");
    let tlsa = TlsaData {
        usage: 3,
        selector: 0,
        matching_type: 0,
        cert_data: cert.iter().map(|b| format!("{:02x}", b)).collect(),
    };
    assert!(verify_cert(&cert, &tlsa).unwrap());
}

#[test]
fn unsupported_usage_is_an_error() {
    let cert = self_signed("msa1.example.");
    let mut tlsa = tlsa_for_cert(&cert).unwrap();
    tlsa.usage = 0;
    assert!(matches!(
        verify_cert(&cert, &tlsa),
        Err(MusicError::PeerVerification { .. })
    ));
}

#[test]
fn common_name_extraction() {
    let cert = self_signed("msa1.example.");
    assert_eq!(
        subject_common_name(&cert).unwrap().as_deref(),
        Some("msa1.example")
    );
}
