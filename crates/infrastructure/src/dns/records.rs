//! RDATA wire codecs between the domain record model and DNS messages.
//!
//! Parsing goes through hickory's decompressed re-emit of each record's
//! RDATA, so these codecs only ever see uncompressed names. Emission
//! produces raw RDATA bytes wrapped in `RData::Unknown`, which keeps the
//! private types (HSYNC, MSIGNER) and the DNSSEC types on one code path.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hickory_proto::rr::rdata::NULL;
use hickory_proto::rr::{DNSClass, Name, RData, Record};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use music_domain::{
    CdsData, CsyncData, DnskeyData, HsyncData, HsyncMethod, KeyData, MusicError, RecordData,
    RecordType, Rrset, SoaData, SvcbData, TlsaData, UriData, ZoneRecord,
};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Wire reading

struct RdataReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RdataReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MusicError> {
        if self.remaining() < n {
            return Err(MusicError::InvalidRecord("truncated RDATA".into()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, MusicError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, MusicError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, MusicError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Uncompressed wire-format name.
    fn name(&mut self) -> Result<String, MusicError> {
        let mut out = String::new();
        loop {
            let len = self.u8()?;
            if len == 0 {
                break;
            }
            if len & 0xC0 != 0 {
                return Err(MusicError::InvalidRecord(
                    "compressed name in RDATA".into(),
                ));
            }
            let label = self.take(len as usize)?;
            out.push_str(&String::from_utf8_lossy(label));
            out.push('.');
        }
        if out.is_empty() {
            out.push('.');
        }
        Ok(out)
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

fn push_name(out: &mut Vec<u8>, name: &str) -> Result<(), MusicError> {
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
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

fn hex_decode(text: &str) -> Result<Vec<u8>, MusicError> {
    if text.len() % 2 != 0 {
        return Err(MusicError::InvalidRecord("odd-length hex string".into()));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| MusicError::InvalidRecord("invalid hex string".into()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Type bitmaps (CSYNC)

fn decode_type_bitmap(reader: &mut RdataReader<'_>) -> Result<Vec<RecordType>, MusicError> {
    let mut types = Vec::new();
    while reader.remaining() > 0 {
        let window = reader.u8()? as u16;
        let len = reader.u8()? as usize;
        let bitmap = reader.take(len)?;
        for (i, byte) in bitmap.iter().enumerate() {
            for bit in 0..8 {
                if byte & (0x80 >> bit) != 0 {
                    let code = window * 256 + (i as u16) * 8 + bit as u16;
                    types.push(RecordType::from_code(code));
                }
            }
        }
    }
    Ok(types)
}

fn encode_type_bitmap(out: &mut Vec<u8>, types: &[RecordType]) {
    let mut codes: Vec<u16> = types.iter().map(|t| t.code()).collect();
    codes.sort_unstable();
    codes.dedup();

    let mut window_start = 0;
    while window_start < codes.len() {
        let window = codes[window_start] / 256;
        let mut bitmap = [0u8; 32];
        let mut max_octet = 0;
        let mut i = window_start;
        while i < codes.len() && codes[i] / 256 == window {
            let low = codes[i] % 256;
            let octet = (low / 8) as usize;
            bitmap[octet] |= 0x80 >> (low % 8);
            max_octet = max_octet.max(octet);
            i += 1;
        }
        out.push(window as u8);
        out.push((max_octet + 1) as u8);
        out.extend_from_slice(&bitmap[..=max_octet]);
        window_start = i;
    }
}

// ---------------------------------------------------------------------------
// Per-type codecs

pub fn decode_rdata(rtype: RecordType, bytes: &[u8]) -> Result<RecordData, MusicError> {
    let mut r = RdataReader::new(bytes);
    let data = match rtype {
        RecordType::NS => RecordData::Ns(r.name()?),
        RecordType::A => {
            let b = r.take(4)?;
            RecordData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
        }
        RecordType::AAAA => {
            let b: [u8; 16] = r.take(16)?.try_into().unwrap();
            RecordData::Aaaa(Ipv6Addr::from(b))
        }
        RecordType::TXT => {
            let mut text = String::new();
            while r.remaining() > 0 {
                let len = r.u8()? as usize;
                text.push_str(&String::from_utf8_lossy(r.take(len)?));
            }
            RecordData::Txt(text)
        }
        RecordType::SOA => RecordData::Soa(SoaData {
            mname: r.name()?,
            rname: r.name()?,
            serial: r.u32()?,
            refresh: r.u32()?,
            retry: r.u32()?,
            expire: r.u32()?,
            minimum: r.u32()?,
        }),
        RecordType::DNSKEY | RecordType::CDNSKEY => {
            let flags = r.u16()?;
            let protocol = r.u8()?;
            let algorithm = r.u8()?;
            let key = DnskeyData {
                flags,
                protocol,
                algorithm,
                public_key: BASE64.encode(r.rest()),
            };
            if rtype == RecordType::DNSKEY {
                RecordData::Dnskey(key)
            } else {
                RecordData::Cdnskey(key)
            }
        }
        RecordType::KEY => RecordData::Key(KeyData {
            flags: r.u16()?,
            protocol: r.u8()?,
            algorithm: r.u8()?,
            public_key: BASE64.encode(r.rest()),
        }),
        RecordType::DS | RecordType::CDS => {
            let ds = CdsData {
                key_tag: r.u16()?,
                algorithm: r.u8()?,
                digest_type: r.u8()?,
                digest: hex_encode(r.rest()),
            };
            if rtype == RecordType::DS {
                RecordData::Ds(ds)
            } else {
                RecordData::Cds(ds)
            }
        }
        RecordType::CSYNC => {
            let serial = r.u32()?;
            let flags = r.u16()?;
            RecordData::Csync(CsyncData {
                serial,
                flags,
                types: decode_type_bitmap(&mut r)?,
            })
        }
        RecordType::TLSA => RecordData::Tlsa(TlsaData {
            usage: r.u8()?,
            selector: r.u8()?,
            matching_type: r.u8()?,
            cert_data: hex_encode(r.rest()),
        }),
        RecordType::SVCB => {
            let priority = r.u16()?;
            let target = r.name()?;
            let mut port = None;
            let mut ipv4hint = Vec::new();
            let mut ipv6hint = Vec::new();
            while r.remaining() >= 4 {
                let key = r.u16()?;
                let len = r.u16()? as usize;
                let value = r.take(len)?;
                match key {
                    3 if len == 2 => port = Some(u16::from_be_bytes([value[0], value[1]])),
                    4 => {
                        for chunk in value.chunks_exact(4) {
                            ipv4hint.push(Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]));
                        }
                    }
                    6 => {
                        for chunk in value.chunks_exact(16) {
                            let octets: [u8; 16] = chunk.try_into().unwrap();
                            ipv6hint.push(Ipv6Addr::from(octets));
                        }
                    }
                    _ => {}
                }
            }
            RecordData::Svcb(SvcbData {
                priority,
                target,
                port,
                ipv4hint,
                ipv6hint,
            })
        }
        RecordType::URI => {
            let priority = r.u16()?;
            let weight = r.u16()?;
            RecordData::Uri(UriData {
                priority,
                weight,
                target: String::from_utf8_lossy(r.rest()).into_owned(),
            })
        }
        RecordType::HSYNC | RecordType::MSIGNER => {
            let method = r.u8()?;
            let method = HsyncMethod::from_code(method).ok_or_else(|| {
                MusicError::InvalidRecord(format!("unknown HSYNC method {}", method))
            })?;
            RecordData::Hsync(HsyncData {
                method,
                target: r.name()?,
            })
        }
        _ => RecordData::Other(hex_encode(bytes)),
    };
    Ok(data)
}

pub fn encode_rdata(data: &RecordData) -> Result<Vec<u8>, MusicError> {
    let mut out = Vec::new();
    match data {
        RecordData::Ns(host) => push_name(&mut out, host)?,
        RecordData::A(addr) => out.extend_from_slice(&addr.octets()),
        RecordData::Aaaa(addr) => out.extend_from_slice(&addr.octets()),
        RecordData::Txt(text) => {
            for chunk in text.as_bytes().chunks(255) {
                out.push(chunk.len() as u8);
                out.extend_from_slice(chunk);
            }
            if text.is_empty() {
                out.push(0);
            }
        }
        RecordData::Soa(soa) => {
            push_name(&mut out, &soa.mname)?;
            push_name(&mut out, &soa.rname)?;
            out.extend_from_slice(&soa.serial.to_be_bytes());
            out.extend_from_slice(&soa.refresh.to_be_bytes());
            out.extend_from_slice(&soa.retry.to_be_bytes());
            out.extend_from_slice(&soa.expire.to_be_bytes());
            out.extend_from_slice(&soa.minimum.to_be_bytes());
        }
        RecordData::Dnskey(key) | RecordData::Cdnskey(key) => {
            out.extend_from_slice(&key.flags.to_be_bytes());
            out.push(key.protocol);
            out.push(key.algorithm);
            out.extend_from_slice(&BASE64.decode(key.public_key.as_bytes()).map_err(|e| {
                MusicError::InvalidRecord(format!("DNSKEY base64: {}", e))
            })?);
        }
        RecordData::Key(key) => {
            out.extend_from_slice(&key.flags.to_be_bytes());
            out.push(key.protocol);
            out.push(key.algorithm);
            out.extend_from_slice(&BASE64.decode(key.public_key.as_bytes()).map_err(|e| {
                MusicError::InvalidRecord(format!("KEY base64: {}", e))
            })?);
        }
        RecordData::Ds(ds) | RecordData::Cds(ds) => {
            out.extend_from_slice(&ds.key_tag.to_be_bytes());
            out.push(ds.algorithm);
            out.push(ds.digest_type);
            out.extend_from_slice(&hex_decode(&ds.digest)?);
        }
        RecordData::Csync(csync) => {
            out.extend_from_slice(&csync.serial.to_be_bytes());
            out.extend_from_slice(&csync.flags.to_be_bytes());
            encode_type_bitmap(&mut out, &csync.types);
        }
        RecordData::Tlsa(tlsa) => {
            out.push(tlsa.usage);
            out.push(tlsa.selector);
            out.push(tlsa.matching_type);
            out.extend_from_slice(&hex_decode(&tlsa.cert_data)?);
        }
        RecordData::Svcb(svcb) => {
            out.extend_from_slice(&svcb.priority.to_be_bytes());
            push_name(&mut out, &svcb.target)?;
            if let Some(port) = svcb.port {
                out.extend_from_slice(&3u16.to_be_bytes());
                out.extend_from_slice(&2u16.to_be_bytes());
                out.extend_from_slice(&port.to_be_bytes());
            }
            if !svcb.ipv4hint.is_empty() {
                out.extend_from_slice(&4u16.to_be_bytes());
                out.extend_from_slice(&((svcb.ipv4hint.len() * 4) as u16).to_be_bytes());
                for addr in &svcb.ipv4hint {
                    out.extend_from_slice(&addr.octets());
                }
            }
            if !svcb.ipv6hint.is_empty() {
                out.extend_from_slice(&6u16.to_be_bytes());
                out.extend_from_slice(&((svcb.ipv6hint.len() * 16) as u16).to_be_bytes());
                for addr in &svcb.ipv6hint {
                    out.extend_from_slice(&addr.octets());
                }
            }
        }
        RecordData::Uri(uri) => {
            out.extend_from_slice(&uri.priority.to_be_bytes());
            out.extend_from_slice(&uri.weight.to_be_bytes());
            out.extend_from_slice(uri.target.as_bytes());
        }
        RecordData::Hsync(hsync) => {
            out.push(hsync.method.code());
            push_name(&mut out, &hsync.target)?;
        }
        RecordData::Other(hex) => out.extend_from_slice(&hex_decode(hex)?),
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// hickory conversions

/// Re-emit a parsed record's RDATA as uncompressed wire bytes.
fn rdata_wire(record: &Record) -> Result<Vec<u8>, MusicError> {
    let mut buf = Vec::with_capacity(64);
    {
        let mut encoder = BinEncoder::new(&mut buf);
        encoder.set_canonical_form(true);
        record
            .data()
            .emit(&mut encoder)
            .map_err(|e| MusicError::DnsProtocol(format!("cannot re-emit RDATA: {}", e)))?;
    }
    Ok(buf)
}

/// Convert one answer record into the domain model.
pub fn record_to_domain(record: &Record) -> Result<ZoneRecord, MusicError> {
    let rtype = RecordType::from_code(u16::from(record.record_type()));
    let bytes = rdata_wire(record)?;
    Ok(ZoneRecord {
        name: record.name().to_string().to_ascii_lowercase(),
        ttl: record.ttl(),
        data: decode_rdata(rtype, &bytes)?,
    })
}

/// Collect the answers of type `rtype` for `owner` into an RRset.
pub fn answers_to_rrset(
    answers: &[Record],
    owner: &str,
    rtype: RecordType,
) -> Result<Rrset, MusicError> {
    let owner_lc = owner.to_ascii_lowercase();
    let mut rrset = Rrset::new(owner_lc.clone(), rtype, 0);
    for record in answers {
        if u16::from(record.record_type()) != rtype.code() {
            continue;
        }
        let zr = record_to_domain(record)?;
        if zr.name != owner_lc {
            continue;
        }
        if rrset.ttl == 0 || zr.ttl < rrset.ttl {
            rrset.ttl = zr.ttl;
        }
        rrset.records.push(zr.data);
    }
    Ok(rrset)
}

/// Build a hickory record for emission into a message. The RDATA rides
/// as `RData::Unknown`, which serialises raw bytes for any type code.
pub fn domain_to_record(
    owner: &str,
    ttl: u32,
    class: DNSClass,
    data: &RecordData,
) -> Result<Record, MusicError> {
    let name = Name::from_str(owner)
        .map_err(|e| MusicError::InvalidZoneName(format!("{}: {}", owner, e)))?;
    let code = data.rtype().code();
    let bytes = encode_rdata(data)?;
    let mut record = Record::from_rdata(
        name,
        ttl,
        RData::Unknown {
            code: hickory_proto::rr::RecordType::Unknown(code),
            rdata: NULL::with(bytes),
        },
    );
    record.set_dns_class(class);
    Ok(record)
}

/// An empty record of `rtype` with class ANY: "delete this RRset" in an
/// UPDATE message.
pub fn delete_rrset_record(owner: &str, rtype: RecordType) -> Result<Record, MusicError> {
    let name = Name::from_str(owner)
        .map_err(|e| MusicError::InvalidZoneName(format!("{}: {}", owner, e)))?;
    let mut record = Record::from_rdata(
        name,
        0,
        RData::Unknown {
            code: hickory_proto::rr::RecordType::Unknown(rtype.code()),
            rdata: NULL::with(Vec::new()),
        },
    );
    record.set_dns_class(DNSClass::ANY);
    Ok(record)
}
