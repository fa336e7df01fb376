//! Shared fixtures: in-memory signer backends and DNS answers plugged
//! into the real store and engine.

use async_trait::async_trait;
use music_application::ports::{DnsLookup, SignerOps};
use music_domain::{MusicError, RecordData, RecordType, Rrset, Signer, SoaData};
use std::collections::HashMap;
use std::sync::Mutex;

type RrsetKey = (String, String, u16);

#[derive(Default)]
pub struct MockSignerOps {
    sets: Mutex<HashMap<RrsetKey, Rrset>>,
}

impl MockSignerOps {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(signer: &str, owner: &str, rtype: RecordType) -> RrsetKey {
        (signer.to_string(), owner.to_string(), rtype.code())
    }

    pub fn seed(&self, signer: &str, rrset: Rrset) {
        let key = Self::key(signer, &rrset.owner, rrset.rtype);
        self.sets.lock().unwrap().insert(key, rrset);
    }

    pub fn served(&self, signer: &str, owner: &str, rtype: RecordType) -> Option<Rrset> {
        self.sets
            .lock()
            .unwrap()
            .get(&Self::key(signer, owner, rtype))
            .cloned()
    }
}

#[async_trait]
impl SignerOps for MockSignerOps {
    async fn fetch_rrset(
        &self,
        signer: &Signer,
        _zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        Ok(self
            .served(&signer.name, owner, rtype)
            .unwrap_or_else(|| Rrset::new(owner.to_string(), rtype, 3600)))
    }

    async fn update_rrsets(
        &self,
        signer: &Signer,
        _zone: &str,
        owner: &str,
        inserts: &[Rrset],
        removes: &[Rrset],
    ) -> Result<(), MusicError> {
        let mut sets = self.sets.lock().unwrap();
        for insert in inserts {
            let key = Self::key(&signer.name, owner, insert.rtype);
            let entry = sets
                .entry(key)
                .or_insert_with(|| Rrset::new(owner.to_string(), insert.rtype, insert.ttl));
            entry.absorb(&insert.records);
        }
        for remove in removes {
            let key = Self::key(&signer.name, owner, remove.rtype);
            if remove.records.is_empty() {
                sets.remove(&key);
            } else if let Some(entry) = sets.get_mut(&key) {
                entry.records.retain(|r| !remove.records.contains(r));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDnsLookup {
    answers: Mutex<HashMap<(String, u16), Rrset>>,
}

impl MockDnsLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_answer(&self, name: &str, rrset: Rrset) {
        self.answers
            .lock()
            .unwrap()
            .insert((name.to_string(), rrset.rtype.code()), rrset);
    }
}

#[async_trait]
impl DnsLookup for MockDnsLookup {
    async fn query(&self, name: &str, rtype: RecordType) -> Result<Rrset, MusicError> {
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&(name.to_string(), rtype.code()))
            .cloned()
            .unwrap_or_else(|| Rrset::new(name.to_string(), rtype, 0)))
    }

    async fn query_at(
        &self,
        _server: &str,
        name: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        self.query(name, rtype).await
    }
}

pub fn soa_rrset(zone: &str, serial: u32) -> Rrset {
    Rrset::with_records(
        zone.to_string(),
        RecordType::SOA,
        3600,
        vec![RecordData::Soa(SoaData {
            mname: format!("ns1.{}", zone),
            rname: format!("hostmaster.{}", zone),
            serial,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum: 3600,
        })],
    )
}
