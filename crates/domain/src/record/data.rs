use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

use super::rtype::RecordType;
use crate::errors::MusicError;

/// DNSKEY RDATA. The public key is kept base64-encoded, as served.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DnskeyData {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: String,
}

impl DnskeyData {
    /// SEP bit set: this is a key-signing key.
    pub fn is_ksk(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    pub fn is_zsk(&self) -> bool {
        !self.is_ksk()
    }

    /// RFC 4034 appendix B key tag over the wire-format RDATA.
    pub fn key_tag(&self) -> Result<u16, MusicError> {
        let key = BASE64
            .decode(self.public_key.as_bytes())
            .map_err(|e| MusicError::InvalidRecord(format!("DNSKEY base64: {}", e)))?;

        let mut rdata = Vec::with_capacity(4 + key.len());
        rdata.extend_from_slice(&self.flags.to_be_bytes());
        rdata.push(self.protocol);
        rdata.push(self.algorithm);
        rdata.extend_from_slice(&key);

        let mut acc: u32 = 0;
        for (i, byte) in rdata.iter().enumerate() {
            if i & 1 == 0 {
                acc += (*byte as u32) << 8;
            } else {
                acc += *byte as u32;
            }
        }
        acc += (acc >> 16) & 0xFFFF;
        Ok((acc & 0xFFFF) as u16)
    }
}

/// CDS RDATA (also used for DS comparisons at the parent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CdsData {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    /// Hex-encoded digest, lowercase.
    pub digest: String,
}

/// CSYNC RDATA: SOA serial, flags and the type bitmap as a type list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CsyncData {
    pub serial: u32,
    pub flags: u16,
    pub types: Vec<RecordType>,
}

impl CsyncData {
    pub const FLAG_IMMEDIATE: u16 = 0x0001;
    pub const FLAG_SOAMINIMUM: u16 = 0x0002;

    /// The CSYNC published during NS synchronisation: immediate, NS only.
    pub fn for_ns(serial: u32) -> Self {
        Self {
            serial,
            flags: Self::FLAG_IMMEDIATE,
            types: vec![RecordType::NS],
        }
    }
}

/// TLSA RDATA binding a peer certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlsaData {
    pub usage: u8,
    pub selector: u8,
    pub matching_type: u8,
    /// Hex-encoded certificate association data, lowercase.
    pub cert_data: String,
}

/// SIG(0) KEY RDATA for DNS-method peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyData {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: String,
}

/// The subset of SVCB service parameters peer discovery consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SvcbData {
    pub priority: u16,
    pub target: String,
    pub port: Option<u16>,
    pub ipv4hint: Vec<Ipv4Addr>,
    pub ipv6hint: Vec<Ipv6Addr>,
}

/// URI RDATA carrying the peer's base-URI template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriData {
    pub priority: u16,
    pub weight: u16,
    pub target: String,
}

/// SOA RDATA; only the serial is inspected, the rest rides along.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoaData {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// Transport method announced in an HSYNC record.
///
/// The source data uses two RR types (HSYNC and the older MSIGNER) and
/// two method tag sets; both collapse onto this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HsyncMethod {
    Api,
    Dns,
}

impl HsyncMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HsyncMethod::Api => "API",
            HsyncMethod::Dns => "DNS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "API" => Some(HsyncMethod::Api),
            "DNS" => Some(HsyncMethod::Dns),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            HsyncMethod::Api => 1,
            HsyncMethod::Dns => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(HsyncMethod::Api),
            2 => Some(HsyncMethod::Dns),
            _ => None,
        }
    }
}

/// HSYNC RDATA: one announced peer sidecar for the owning zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HsyncData {
    pub method: HsyncMethod,
    pub target: String,
}

/// Typed RDATA for the record types the coordination logic inspects;
/// anything else rides along in presentation form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordData {
    Ns(String),
    Dnskey(DnskeyData),
    Cds(CdsData),
    Cdnskey(DnskeyData),
    Csync(CsyncData),
    Ds(CdsData),
    Key(KeyData),
    Tlsa(TlsaData),
    Svcb(SvcbData),
    Uri(UriData),
    Hsync(HsyncData),
    Soa(SoaData),
    Txt(String),
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Other(String),
}

impl RecordData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordData::Ns(_) => RecordType::NS,
            RecordData::Dnskey(_) => RecordType::DNSKEY,
            RecordData::Cds(_) => RecordType::CDS,
            RecordData::Cdnskey(_) => RecordType::CDNSKEY,
            RecordData::Csync(_) => RecordType::CSYNC,
            RecordData::Ds(_) => RecordType::DS,
            RecordData::Key(_) => RecordType::KEY,
            RecordData::Tlsa(_) => RecordType::TLSA,
            RecordData::Svcb(_) => RecordType::SVCB,
            RecordData::Uri(_) => RecordType::URI,
            RecordData::Hsync(_) => RecordType::HSYNC,
            RecordData::Soa(_) => RecordType::SOA,
            RecordData::Txt(_) => RecordType::TXT,
            RecordData::A(_) => RecordType::A,
            RecordData::Aaaa(_) => RecordType::AAAA,
            RecordData::Other(_) => RecordType::Other(0),
        }
    }

    pub fn as_dnskey(&self) -> Option<&DnskeyData> {
        match self {
            RecordData::Dnskey(k) | RecordData::Cdnskey(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_ns(&self) -> Option<&str> {
        match self {
            RecordData::Ns(host) => Some(host),
            _ => None,
        }
    }

    pub fn as_hsync(&self) -> Option<&HsyncData> {
        match self {
            RecordData::Hsync(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_soa(&self) -> Option<&SoaData> {
        match self {
            RecordData::Soa(s) => Some(s),
            _ => None,
        }
    }
}
