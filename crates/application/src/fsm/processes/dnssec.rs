//! DS digest computation for CDS publication.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use music_domain::{CdsData, DnskeyData, MusicError};
use sha2::{Digest, Sha256};

/// SHA-256, the digest type published in CDS records.
pub const DIGEST_TYPE_SHA256: u8 = 2;

/// Uncompressed lowercase wire form of a domain name.
pub fn name_to_wire(name: &str) -> Result<Vec<u8>, MusicError> {
    let mut wire = Vec::with_capacity(name.len() + 1);
    for label in name.trim_end_matches('.').split('.') {
        if label.is_empty() {
            continue;
        }
        if label.len() > 63 {
            return Err(MusicError::InvalidRecord(format!(
                "label '{}' exceeds 63 octets",
                label
            )));
        }
        wire.push(label.len() as u8);
        wire.extend_from_slice(label.to_ascii_lowercase().as_bytes());
    }
    wire.push(0);
    Ok(wire)
}

fn dnskey_rdata_wire(key: &DnskeyData) -> Result<Vec<u8>, MusicError> {
    let material = BASE64
        .decode(key.public_key.as_bytes())
        .map_err(|e| MusicError::InvalidRecord(format!("DNSKEY base64: {}", e)))?;
    let mut rdata = Vec::with_capacity(4 + material.len());
    rdata.extend_from_slice(&key.flags.to_be_bytes());
    rdata.push(key.protocol);
    rdata.push(key.algorithm);
    rdata.extend_from_slice(&material);
    Ok(rdata)
}

/// The CDS record matching one DNSKEY: key tag, algorithm and the
/// SHA-256 digest over owner name plus DNSKEY RDATA (RFC 4034 section
/// 5.1.4).
pub fn cds_for_key(owner: &str, key: &DnskeyData) -> Result<CdsData, MusicError> {
    let mut hasher = Sha256::new();
    hasher.update(name_to_wire(owner)?);
    hasher.update(dnskey_rdata_wire(key)?);
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(hex, "{:02x}", byte);
    }

    Ok(CdsData {
        key_tag: key.key_tag()?,
        algorithm: key.algorithm,
        digest_type: DIGEST_TYPE_SHA256,
        digest: hex,
    })
}
