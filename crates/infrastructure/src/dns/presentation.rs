//! Presentation-format rendering and parsing for the record types MUSIC
//! moves through REST updaters and the debug API.

use music_domain::{
    CdsData, CsyncData, DnskeyData, HsyncData, HsyncMethod, KeyData, MusicError, RecordData,
    RecordType, SoaData, TlsaData, UriData,
};

pub fn data_to_presentation(data: &RecordData) -> String {
    match data {
        RecordData::Ns(host) => host.clone(),
        RecordData::A(addr) => addr.to_string(),
        RecordData::Aaaa(addr) => addr.to_string(),
        RecordData::Txt(text) => format!("\"{}\"", text),
        RecordData::Dnskey(k) | RecordData::Cdnskey(k) => {
            format!("{} {} {} {}", k.flags, k.protocol, k.algorithm, k.public_key)
        }
        RecordData::Key(k) => {
            format!("{} {} {} {}", k.flags, k.protocol, k.algorithm, k.public_key)
        }
        RecordData::Ds(ds) | RecordData::Cds(ds) => format!(
            "{} {} {} {}",
            ds.key_tag,
            ds.algorithm,
            ds.digest_type,
            ds.digest.to_uppercase()
        ),
        RecordData::Csync(c) => {
            let types: Vec<String> = c.types.iter().map(|t| t.to_string()).collect();
            format!("{} {} {}", c.serial, c.flags, types.join(" "))
        }
        RecordData::Tlsa(t) => format!(
            "{} {} {} {}",
            t.usage,
            t.selector,
            t.matching_type,
            t.cert_data.to_uppercase()
        ),
        RecordData::Uri(u) => format!("{} {} \"{}\"", u.priority, u.weight, u.target),
        RecordData::Svcb(s) => {
            let mut out = format!("{} {}", s.priority, s.target);
            if let Some(port) = s.port {
                out.push_str(&format!(" port={}", port));
            }
            out
        }
        RecordData::Hsync(h) => format!("{} {}", h.method.as_str(), h.target),
        RecordData::Soa(s) => format!(
            "{} {} {} {} {} {} {}",
            s.mname, s.rname, s.serial, s.refresh, s.retry, s.expire, s.minimum
        ),
        RecordData::Other(hex) => format!("\\# {}", hex),
    }
}

fn invalid(rtype: RecordType, text: &str) -> MusicError {
    MusicError::InvalidRecord(format!("cannot parse {} '{}'", rtype, text))
}

pub fn parse_presentation(rtype: RecordType, text: &str) -> Result<RecordData, MusicError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    let data = match rtype {
        RecordType::NS => RecordData::Ns(text.trim().to_string()),
        RecordType::A => RecordData::A(text.trim().parse().map_err(|_| invalid(rtype, text))?),
        RecordType::AAAA => {
            RecordData::Aaaa(text.trim().parse().map_err(|_| invalid(rtype, text))?)
        }
        RecordType::TXT => RecordData::Txt(text.trim().trim_matches('"').to_string()),
        RecordType::DNSKEY | RecordType::CDNSKEY | RecordType::KEY => {
            if fields.len() < 4 {
                return Err(invalid(rtype, text));
            }
            let flags = fields[0].parse().map_err(|_| invalid(rtype, text))?;
            let protocol = fields[1].parse().map_err(|_| invalid(rtype, text))?;
            let algorithm = fields[2].parse().map_err(|_| invalid(rtype, text))?;
            let public_key = fields[3..].concat();
            match rtype {
                RecordType::DNSKEY => RecordData::Dnskey(DnskeyData {
                    flags,
                    protocol,
                    algorithm,
                    public_key,
                }),
                RecordType::CDNSKEY => RecordData::Cdnskey(DnskeyData {
                    flags,
                    protocol,
                    algorithm,
                    public_key,
                }),
                _ => RecordData::Key(KeyData {
                    flags,
                    protocol,
                    algorithm,
                    public_key,
                }),
            }
        }
        RecordType::DS | RecordType::CDS => {
            if fields.len() < 4 {
                return Err(invalid(rtype, text));
            }
            let ds = CdsData {
                key_tag: fields[0].parse().map_err(|_| invalid(rtype, text))?,
                algorithm: fields[1].parse().map_err(|_| invalid(rtype, text))?,
                digest_type: fields[2].parse().map_err(|_| invalid(rtype, text))?,
                digest: fields[3..].concat().to_lowercase(),
            };
            if rtype == RecordType::DS {
                RecordData::Ds(ds)
            } else {
                RecordData::Cds(ds)
            }
        }
        RecordType::CSYNC => {
            if fields.len() < 2 {
                return Err(invalid(rtype, text));
            }
            let types = fields[2..]
                .iter()
                .filter_map(|t| RecordType::parse(t))
                .collect();
            RecordData::Csync(CsyncData {
                serial: fields[0].parse().map_err(|_| invalid(rtype, text))?,
                flags: fields[1].parse().map_err(|_| invalid(rtype, text))?,
                types,
            })
        }
        RecordType::TLSA => {
            if fields.len() < 4 {
                return Err(invalid(rtype, text));
            }
            RecordData::Tlsa(TlsaData {
                usage: fields[0].parse().map_err(|_| invalid(rtype, text))?,
                selector: fields[1].parse().map_err(|_| invalid(rtype, text))?,
                matching_type: fields[2].parse().map_err(|_| invalid(rtype, text))?,
                cert_data: fields[3..].concat().to_lowercase(),
            })
        }
        RecordType::URI => {
            if fields.len() < 3 {
                return Err(invalid(rtype, text));
            }
            RecordData::Uri(UriData {
                priority: fields[0].parse().map_err(|_| invalid(rtype, text))?,
                weight: fields[1].parse().map_err(|_| invalid(rtype, text))?,
                target: fields[2..].join(" ").trim_matches('"').to_string(),
            })
        }
        RecordType::HSYNC | RecordType::MSIGNER => {
            if fields.len() != 2 {
                return Err(invalid(rtype, text));
            }
            RecordData::Hsync(HsyncData {
                method: HsyncMethod::parse(fields[0]).ok_or_else(|| invalid(rtype, text))?,
                target: fields[1].to_string(),
            })
        }
        RecordType::SOA => {
            if fields.len() != 7 {
                return Err(invalid(rtype, text));
            }
            RecordData::Soa(SoaData {
                mname: fields[0].to_string(),
                rname: fields[1].to_string(),
                serial: fields[2].parse().map_err(|_| invalid(rtype, text))?,
                refresh: fields[3].parse().map_err(|_| invalid(rtype, text))?,
                retry: fields[4].parse().map_err(|_| invalid(rtype, text))?,
                expire: fields[5].parse().map_err(|_| invalid(rtype, text))?,
                minimum: fields[6].parse().map_err(|_| invalid(rtype, text))?,
            })
        }
        _ => RecordData::Other(text.trim().to_string()),
    };
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dnskey_round_trip() {
        let text = "257 3 13 mdsswUyr3DPW132mOi8V9xESWE8jTo0dxCjjnopKl+GqJxpVXckHAeF+KkxLbxILfDLUT0rAK9iUzy1L53eKGQ==";
        let data = parse_presentation(RecordType::DNSKEY, text).unwrap();
        assert_eq!(data_to_presentation(&data), text);
    }

    #[test]
    fn hsync_round_trip() {
        let data = parse_presentation(RecordType::HSYNC, "API msa1.example.").unwrap();
        assert_eq!(data_to_presentation(&data), "API msa1.example.");
        assert!(parse_presentation(RecordType::HSYNC, "CARRIER-PIGEON x.").is_err());
    }

    #[test]
    fn csync_fields() {
        let data = parse_presentation(RecordType::CSYNC, "2023010501 1 NS A AAAA").unwrap();
        let RecordData::Csync(csync) = &data else {
            panic!("wrong variant");
        };
        assert_eq!(csync.serial, 2023010501);
        assert_eq!(csync.types.len(), 3);
    }
}
