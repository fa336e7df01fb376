//! SIG(0)-signed DNS transport for DNS-method peers.
//!
//! Beats ride as a NOTIFY-opcode message with the JSON payload in a TXT
//! additional record, signed with this sidecar's SIG(0) key (RFC 2931).
//! Peers verify against the KEY RR published at `dns.<identity>`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::NULL;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType as HickoryRecordType};
use music_domain::{MusicError, RecordData, Sidecar};
use ring::signature::Ed25519KeyPair;
use serde::Serialize;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

use super::super::dns::client::{exchange, serialize_message};

const SIG_RRTYPE: u16 = 24;
const ALGORITHM_ED25519: u8 = 15;
const SIG_VALIDITY_SECS: u32 = 300;

fn push_wire_name(out: &mut Vec<u8>, name: &str) -> Result<(), MusicError> {
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
        out.push(label.len() as u8);
        out.extend_from_slice(label.to_ascii_lowercase().as_bytes());
    }
    out.push(0);
    Ok(())
}

/// This sidecar's SIG(0) signing key, loaded from a BIND-format private
/// key file.
pub struct Sig0Signer {
    key_pair: Ed25519KeyPair,
    signer_name: String,
    key_tag: u16,
}

impl Sig0Signer {
    /// Parse a BIND `K*.private` file. Only ED25519 keys are supported.
    pub fn from_bind_file(path: &str, signer_name: &str) -> Result<Self, MusicError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MusicError::Config(format!("cannot read SIG(0) key {}: {}", path, e)))?;

        let mut algorithm = None;
        let mut private_key = None;
        for line in text.lines() {
            if let Some(value) = line.strip_prefix("Algorithm:") {
                algorithm = value.trim().split_whitespace().next().map(str::to_string);
            }
            if let Some(value) = line.strip_prefix("PrivateKey:") {
                private_key = Some(value.trim().to_string());
            }
        }

        match algorithm.as_deref() {
            Some("15") => {}
            other => {
                return Err(MusicError::Config(format!(
                    "SIG(0) key {}: unsupported algorithm {:?}, only ED25519 (15)",
                    path, other
                )))
            }
        }
        let seed = BASE64
            .decode(private_key.ok_or_else(|| {
                MusicError::Config(format!("SIG(0) key {}: no PrivateKey line", path))
            })?)
            .map_err(|e| MusicError::Config(format!("SIG(0) key {}: {}", path, e)))?;

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed)
            .map_err(|e| MusicError::Config(format!("SIG(0) key {}: {}", path, e)))?;

        // RFC 4034 key tag over the public KEY RDATA.
        let public = <Ed25519KeyPair as ring::signature::KeyPair>::public_key(&key_pair);
        let mut rdata = Vec::new();
        rdata.extend_from_slice(&0u16.to_be_bytes());
        rdata.push(3);
        rdata.push(ALGORITHM_ED25519);
        rdata.extend_from_slice(public.as_ref());
        let mut acc: u32 = 0;
        for (i, byte) in rdata.iter().enumerate() {
            if i & 1 == 0 {
                acc += (*byte as u32) << 8;
            } else {
                acc += *byte as u32;
            }
        }
        acc += (acc >> 16) & 0xFFFF;

        Ok(Self {
            key_pair,
            signer_name: signer_name.to_string(),
            key_tag: (acc & 0xFFFF) as u16,
        })
    }

    /// SIG(0) RDATA over an outgoing message (RFC 2931 section 3): the
    /// signature covers the SIG RDATA minus the signature field followed
    /// by the unsigned message.
    fn sig0_rdata(&self, message_wire: &[u8]) -> Result<Vec<u8>, MusicError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;

        let mut rdata = Vec::with_capacity(128);
        rdata.extend_from_slice(&0u16.to_be_bytes()); // type covered: 0 for SIG(0)
        rdata.push(ALGORITHM_ED25519);
        rdata.push(0); // labels
        rdata.extend_from_slice(&0u32.to_be_bytes()); // original TTL
        rdata.extend_from_slice(&(now + SIG_VALIDITY_SECS).to_be_bytes());
        rdata.extend_from_slice(&(now.saturating_sub(SIG_VALIDITY_SECS)).to_be_bytes());
        rdata.extend_from_slice(&self.key_tag.to_be_bytes());
        push_wire_name(&mut rdata, &self.signer_name)?;

        let mut signed_data = rdata.clone();
        signed_data.extend_from_slice(message_wire);
        let signature = self.key_pair.sign(&signed_data);
        rdata.extend_from_slice(signature.as_ref());
        Ok(rdata)
    }
}

/// Sends signed beat payloads to DNS-method peers.
pub struct DnsBeatSender {
    signer: Option<Sig0Signer>,
    timeout: Duration,
}

impl DnsBeatSender {
    pub fn new(signer: Option<Sig0Signer>) -> Self {
        Self {
            signer,
            timeout: Duration::from_secs(1),
        }
    }

    #[instrument(skip(self, peer, payload), fields(peer = %peer.identity))]
    pub async fn send<T: Serialize>(
        &self,
        peer: &Sidecar,
        payload: &T,
    ) -> Result<(), MusicError> {
        let Some(dns) = &peer.dns else {
            return Err(MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: "peer has no DNS method details".to_string(),
            });
        };
        let Some(address) = dns.addresses.first() else {
            return Err(MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: "peer DNS method has no addresses".to_string(),
            });
        };
        let Some(signer) = &self.signer else {
            return Err(MusicError::Config(
                "sidecar.dns.key_file not configured, cannot sign beats".to_string(),
            ));
        };

        let encoded = serde_json::to_string(payload)
            .map_err(|e| MusicError::Config(format!("cannot encode beat payload: {}", e)))?;

        let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Notify);
        let mut query = Query::new();
        query.set_name(Name::from_str(&peer.identity).map_err(|e| {
            MusicError::InvalidZoneName(format!("{}: {}", peer.identity, e))
        })?);
        query.set_query_type(HickoryRecordType::TXT);
        query.set_query_class(DNSClass::IN);
        message.add_query(query);

        message.add_additional(crate::dns::records::domain_to_record(
            &signer.signer_name,
            0,
            DNSClass::IN,
            &RecordData::Txt(encoded),
        )?);

        // Sign the message as it stands, then append the SIG(0) record.
        let unsigned_wire = serialize_message(&message)?;
        let sig_rdata = signer.sig0_rdata(&unsigned_wire)?;
        let mut sig_record = Record::from_rdata(
            Name::root(),
            0,
            RData::Unknown {
                code: HickoryRecordType::Unknown(SIG_RRTYPE),
                rdata: NULL::with(sig_rdata),
            },
        );
        sig_record.set_dns_class(DNSClass::ANY);
        message.add_additional(sig_record);

        let server = SocketAddr::new(*address, dns.port);
        let response = exchange(&message, server, self.timeout).await?;
        if response.response_code() != ResponseCode::NoError {
            return Err(MusicError::PeerVerification {
                identity: peer.identity.clone(),
                detail: format!("beat answered {}", response.response_code()),
            });
        }
        debug!(peer = %peer.identity, "Signed DNS beat delivered");
        Ok(())
    }
}
