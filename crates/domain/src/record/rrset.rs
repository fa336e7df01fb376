use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::data::RecordData;
use super::rtype::RecordType;

/// A single record with its owner name and TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
}

/// All records sharing one owner name and type.
///
/// FSM actions work on RRsets as sets: equality and difference ignore TTL
/// and record order, so that "ensure the set contains X" is expressible
/// without caring how a signer serialises its answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rrset {
    pub owner: String,
    pub rtype: RecordType,
    pub ttl: u32,
    pub records: Vec<RecordData>,
}

impl Rrset {
    pub fn new(owner: String, rtype: RecordType, ttl: u32) -> Self {
        Self {
            owner,
            rtype,
            ttl,
            records: Vec::new(),
        }
    }

    pub fn with_records(owner: String, rtype: RecordType, ttl: u32, records: Vec<RecordData>) -> Self {
        Self {
            owner,
            rtype,
            ttl,
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, data: &RecordData) -> bool {
        self.records.iter().any(|r| r == data)
    }

    /// Records present in `other` but missing here.
    pub fn missing_from(&self, other: &Rrset) -> Vec<RecordData> {
        other
            .records
            .iter()
            .filter(|r| !self.contains(r))
            .cloned()
            .collect()
    }

    /// Records present here but absent from `other`.
    pub fn extra_over(&self, other: &Rrset) -> Vec<RecordData> {
        self.records
            .iter()
            .filter(|r| !other.contains(r))
            .cloned()
            .collect()
    }

    /// True when both sets hold exactly the same records, ignoring order
    /// and TTL.
    pub fn same_records(&self, other: &Rrset) -> bool {
        self.len() == other.len() && self.missing_from(other).is_empty()
    }

    /// Add records not already present; returns how many were new.
    pub fn absorb(&mut self, records: &[RecordData]) -> usize {
        let mut added = 0;
        for record in records {
            if !self.contains(record) {
                self.records.push(record.clone());
                added += 1;
            }
        }
        added
    }

    /// The set union of several same-typed RRsets, e.g. the DNSKEYs of all
    /// signers in a group.
    pub fn union(owner: &str, rtype: RecordType, ttl: u32, sets: &[Rrset]) -> Rrset {
        let mut out = Rrset::new(owner.to_string(), rtype, ttl);
        for set in sets {
            out.absorb(&set.records);
        }
        out
    }

    /// NS hostnames in this set, sorted and deduplicated.
    pub fn ns_hosts(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.as_ns().map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::data::DnskeyData;

    fn dnskey(tag: u8) -> RecordData {
        RecordData::Dnskey(DnskeyData {
            flags: 256,
            protocol: 3,
            algorithm: 13,
            public_key: format!("a2V5e{}==", tag),
        })
    }

    #[test]
    fn union_deduplicates() {
        let a = Rrset::with_records("z.".into(), RecordType::DNSKEY, 3600, vec![dnskey(1), dnskey(2)]);
        let b = Rrset::with_records("z.".into(), RecordType::DNSKEY, 7200, vec![dnskey(2), dnskey(3)]);
        let union = Rrset::union("z.", RecordType::DNSKEY, 3600, &[a, b]);
        assert_eq!(union.len(), 3);
    }

    #[test]
    fn same_records_ignores_order_and_ttl() {
        let a = Rrset::with_records("z.".into(), RecordType::DNSKEY, 3600, vec![dnskey(1), dnskey(2)]);
        let b = Rrset::with_records("z.".into(), RecordType::DNSKEY, 60, vec![dnskey(2), dnskey(1)]);
        assert!(a.same_records(&b));
    }

    #[test]
    fn missing_and_extra_are_inverses() {
        let a = Rrset::with_records("z.".into(), RecordType::DNSKEY, 3600, vec![dnskey(1)]);
        let b = Rrset::with_records("z.".into(), RecordType::DNSKEY, 3600, vec![dnskey(1), dnskey(2)]);
        assert_eq!(a.missing_from(&b).len(), 1);
        assert!(a.extra_over(&b).is_empty());
        assert_eq!(b.extra_over(&a).len(), 1);
    }

    #[test]
    fn absorb_is_idempotent() {
        let mut set = Rrset::new("z.".into(), RecordType::DNSKEY, 3600);
        assert_eq!(set.absorb(&[dnskey(1), dnskey(2)]), 2);
        assert_eq!(set.absorb(&[dnskey(1), dnskey(2)]), 0);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ns_hosts_sorted() {
        let set = Rrset::with_records(
            "z.".into(),
            RecordType::NS,
            3600,
            vec![
                RecordData::Ns("ns2.example.".into()),
                RecordData::Ns("ns1.example.".into()),
            ],
        );
        let hosts: Vec<String> = set.ns_hosts().into_iter().collect();
        assert_eq!(hosts, vec!["ns1.example.".to_string(), "ns2.example.".into()]);
    }
}
