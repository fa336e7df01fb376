use serde::{Deserialize, Serialize};

/// Private-use RR type code announcing peer sidecars for a zone.
pub const HSYNC_TYPE_CODE: u16 = 65501;

/// Legacy alias for HSYNC still published by some zones (DELEG-SYNC).
pub const MSIGNER_TYPE_CODE: u16 = 65502;

/// The record types MUSIC queries or rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    AAAA,
    NS,
    SOA,
    TXT,
    DNSKEY,
    CDS,
    CDNSKEY,
    CSYNC,
    DS,
    KEY,
    TLSA,
    URI,
    SVCB,
    HSYNC,
    MSIGNER,
    Other(u16),
}

impl RecordType {
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::AAAA => 28,
            RecordType::NS => 2,
            RecordType::SOA => 6,
            RecordType::TXT => 16,
            RecordType::DNSKEY => 48,
            RecordType::CDS => 59,
            RecordType::CDNSKEY => 60,
            RecordType::CSYNC => 62,
            RecordType::DS => 43,
            RecordType::KEY => 25,
            RecordType::TLSA => 52,
            RecordType::URI => 256,
            RecordType::SVCB => 64,
            RecordType::HSYNC => HSYNC_TYPE_CODE,
            RecordType::MSIGNER => MSIGNER_TYPE_CODE,
            RecordType::Other(code) => *code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            1 => RecordType::A,
            28 => RecordType::AAAA,
            2 => RecordType::NS,
            6 => RecordType::SOA,
            16 => RecordType::TXT,
            48 => RecordType::DNSKEY,
            59 => RecordType::CDS,
            60 => RecordType::CDNSKEY,
            62 => RecordType::CSYNC,
            43 => RecordType::DS,
            25 => RecordType::KEY,
            52 => RecordType::TLSA,
            256 => RecordType::URI,
            64 => RecordType::SVCB,
            HSYNC_TYPE_CODE => RecordType::HSYNC,
            MSIGNER_TYPE_CODE => RecordType::MSIGNER,
            other => RecordType::Other(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::NS => "NS",
            RecordType::SOA => "SOA",
            RecordType::TXT => "TXT",
            RecordType::DNSKEY => "DNSKEY",
            RecordType::CDS => "CDS",
            RecordType::CDNSKEY => "CDNSKEY",
            RecordType::CSYNC => "CSYNC",
            RecordType::DS => "DS",
            RecordType::KEY => "KEY",
            RecordType::TLSA => "TLSA",
            RecordType::URI => "URI",
            RecordType::SVCB => "SVCB",
            RecordType::HSYNC => "HSYNC",
            RecordType::MSIGNER => "MSIGNER",
            RecordType::Other(_) => "TYPE?",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::AAAA),
            "NS" => Some(RecordType::NS),
            "SOA" => Some(RecordType::SOA),
            "TXT" => Some(RecordType::TXT),
            "DNSKEY" => Some(RecordType::DNSKEY),
            "CDS" => Some(RecordType::CDS),
            "CDNSKEY" => Some(RecordType::CDNSKEY),
            "CSYNC" => Some(RecordType::CSYNC),
            "DS" => Some(RecordType::DS),
            "KEY" => Some(RecordType::KEY),
            "TLSA" => Some(RecordType::TLSA),
            "URI" => Some(RecordType::URI),
            "SVCB" => Some(RecordType::SVCB),
            "HSYNC" => Some(RecordType::HSYNC),
            "MSIGNER" | "DELEG-SYNC" => Some(RecordType::MSIGNER),
            other => other
                .strip_prefix("TYPE")
                .and_then(|n| n.parse::<u16>().ok())
                .map(RecordType::from_code),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::Other(code) => write!(f, "TYPE{}", code),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for rtype in [
            RecordType::NS,
            RecordType::DNSKEY,
            RecordType::CSYNC,
            RecordType::HSYNC,
            RecordType::MSIGNER,
            RecordType::URI,
        ] {
            assert_eq!(RecordType::from_code(rtype.code()), rtype);
        }
    }

    #[test]
    fn parse_accepts_deleg_sync_alias() {
        assert_eq!(RecordType::parse("DELEG-SYNC"), Some(RecordType::MSIGNER));
        assert_eq!(RecordType::parse("TYPE65280"), Some(RecordType::Other(65280)));
    }
}
