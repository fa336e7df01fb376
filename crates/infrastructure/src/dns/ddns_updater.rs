//! RFC 2136 dynamic-update implementation of the signer-updater
//! contract, with TSIG authentication.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hickory_proto::dnssec::rdata::tsig::TsigAlgorithm;
use hickory_proto::dnssec::tsig::TSigner;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RecordType as HickoryRecordType};
use music_application::ports::SignerUpdater;
use music_domain::{MusicError, RecordType, Rrset, Signer};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

use super::client::{exchange, parse_server};
use super::records;

const DEFAULT_UPDATE_TTL: u32 = 3600;

pub struct DdnsUpdater {
    timeout: Duration,
}

impl DdnsUpdater {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn tsig_signer(signer: &Signer) -> Result<Option<TSigner>, MusicError> {
        let Some((key_name, algorithm, secret)) = signer.tsig() else {
            return Ok(None);
        };

        let key = BASE64
            .decode(secret.as_bytes())
            .map_err(|e| MusicError::Config(format!("TSIG secret for '{}': {}", signer.name, e)))?;
        let algorithm = match algorithm.to_ascii_lowercase().as_str() {
            "hmac-sha256" | "hmac-sha256." => TsigAlgorithm::HmacSha256,
            "hmac-sha384" | "hmac-sha384." => TsigAlgorithm::HmacSha384,
            "hmac-sha512" | "hmac-sha512." => TsigAlgorithm::HmacSha512,
            other => {
                return Err(MusicError::Config(format!(
                    "unsupported TSIG algorithm '{}' for signer '{}'",
                    other, signer.name
                )))
            }
        };
        let key_name = Name::from_str(key_name)
            .map_err(|e| MusicError::Config(format!("TSIG key name: {}", e)))?;

        let tsigner = TSigner::new(key, algorithm, key_name, 300)
            .map_err(|e| MusicError::Config(format!("TSIG signer: {}", e)))?;
        Ok(Some(tsigner))
    }

    fn sign_if_configured(message: &mut Message, signer: &Signer) -> Result<(), MusicError> {
        if let Some(tsigner) = Self::tsig_signer(signer)? {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as u32;
            message
                .finalize(&tsigner, now)
                .map_err(|e| MusicError::DnsProtocol(format!("TSIG signing failed: {}", e)))?;
        }
        Ok(())
    }

    async fn send(
        &self,
        signer: &Signer,
        message: &Message,
        what: &str,
    ) -> Result<Message, MusicError> {
        let server = parse_server(&signer.endpoint())?;
        let response = exchange(message, server, self.timeout).await?;
        if response.response_code() != ResponseCode::NoError {
            return Err(MusicError::SignerOpFailed {
                signer: signer.name.clone(),
                detail: format!("{} answered {}", what, response.response_code()),
            });
        }
        Ok(response)
    }
}

impl Default for DdnsUpdater {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignerUpdater for DdnsUpdater {
    #[instrument(skip(self, signer), fields(signer = %signer.name))]
    async fn fetch_rrset(
        &self,
        signer: &Signer,
        _zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        let mut message = super::client::build_query(owner, rtype, false)?;
        Self::sign_if_configured(&mut message, signer)?;

        let response = self.send(signer, &message, "QUERY").await?;
        let rrset = records::answers_to_rrset(response.answers(), owner, rtype)?;
        debug!(owner = %owner, rtype = %rtype, records = rrset.len(), "Fetched RRset via DDNS");
        Ok(rrset)
    }

    #[instrument(skip(self, signer, inserts, removes), fields(signer = %signer.name))]
    async fn update_rrsets(
        &self,
        signer: &Signer,
        zone: &str,
        _owner: &str,
        inserts: &[Rrset],
        removes: &[Rrset],
    ) -> Result<(), MusicError> {
        let zone_name = Name::from_str(zone)
            .map_err(|e| MusicError::InvalidZoneName(format!("{}: {}", zone, e)))?;

        let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Update);

        // RFC 2136: the zone section is the question, updates ride in the
        // authority section.
        let mut zone_section = Query::new();
        zone_section.set_name(zone_name);
        zone_section.set_query_type(HickoryRecordType::SOA);
        zone_section.set_query_class(DNSClass::IN);
        message.add_query(zone_section);

        for rrset in inserts {
            let ttl = if rrset.ttl == 0 {
                DEFAULT_UPDATE_TTL
            } else {
                rrset.ttl
            };
            for data in &rrset.records {
                message.add_name_server(records::domain_to_record(
                    &rrset.owner,
                    ttl,
                    DNSClass::IN,
                    data,
                )?);
            }
        }
        for rrset in removes {
            if rrset.records.is_empty() {
                // Delete the entire RRset: class ANY, no RDATA.
                message.add_name_server(records::delete_rrset_record(&rrset.owner, rrset.rtype)?);
            } else {
                // Delete specific records: class NONE, TTL 0.
                for data in &rrset.records {
                    message.add_name_server(records::domain_to_record(
                        &rrset.owner,
                        0,
                        DNSClass::NONE,
                        data,
                    )?);
                }
            }
        }

        Self::sign_if_configured(&mut message, signer)?;
        self.send(signer, &message, "UPDATE").await?;
        debug!(zone = %zone, inserts = inserts.len(), removes = removes.len(), "DNS UPDATE applied");
        Ok(())
    }
}
