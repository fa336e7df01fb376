//! Minimal port stubs for ticker tests. Only the calls the jobs make
//! are meaningful; everything else answers with empty defaults.

use async_trait::async_trait;
use music_application::fsm::{FsmContext, FsmEngine, ProcessRegistry};
use music_application::ports::{
    DnsLookup, GroupRepository, SignerOps, SignerRepository, ZoneRepository,
};
use music_domain::config::FsmIntervals;
use music_domain::{
    DnskeyData, FsmStatus, MusicError, RecordType, Rrset, Signer, SignerGroup, Zone,
};
use std::sync::Arc;

pub struct StubZoneRepository {
    pub zones: Vec<Zone>,
}

#[async_trait]
impl ZoneRepository for StubZoneRepository {
    async fn add_zone(&self, _zone: &Zone) -> Result<(), MusicError> {
        Ok(())
    }
    async fn get_zone(&self, name: &str) -> Result<Option<Zone>, MusicError> {
        Ok(self.zones.iter().find(|z| z.name == name).cloned())
    }
    async fn list_zones(&self) -> Result<Vec<Zone>, MusicError> {
        Ok(self.zones.clone())
    }
    async fn list_auto_zones(&self) -> Result<Vec<Zone>, MusicError> {
        Ok(self
            .zones
            .iter()
            .filter(|z| z.fsm_mode == music_domain::FsmMode::Auto)
            .cloned()
            .collect())
    }
    async fn update_zone(&self, _zone: &Zone) -> Result<(), MusicError> {
        Ok(())
    }
    async fn delete_zone(&self, _name: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn attach_fsm(
        &self,
        _zone: &str,
        _process: &str,
        _initial_state: &str,
        _preempt: bool,
    ) -> Result<(), MusicError> {
        Ok(())
    }
    async fn detach_fsm(&self, _zone: &str, _process: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn state_transition(
        &self,
        _zone: &str,
        _from: &str,
        _to: &str,
    ) -> Result<(), MusicError> {
        Ok(())
    }
    async fn set_fsm_status(&self, _zone: &str, _status: FsmStatus) -> Result<(), MusicError> {
        Ok(())
    }
    async fn set_stop_reason(&self, _zone: &str, _reason: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn get_stop_reason(&self, _zone: &str) -> Result<Option<String>, MusicError> {
        Ok(None)
    }
    async fn zone_join_group(&self, _zone: &str, _group: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn zone_leave_group(&self, _zone: &str, _group: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn get_meta(&self, _zone: &str, _key: &str) -> Result<Option<String>, MusicError> {
        Ok(None)
    }
    async fn set_meta(&self, _zone: &str, _key: &str, _value: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn set_zone_nses(
        &self,
        _zone: &str,
        _signer: &str,
        _nses: &[String],
    ) -> Result<(), MusicError> {
        Ok(())
    }
    async fn get_zone_nses(&self, _zone: &str, _signer: &str) -> Result<Vec<String>, MusicError> {
        Ok(vec![])
    }
    async fn set_zone_dnskeys(
        &self,
        _zone: &str,
        _signer: &str,
        _keys: &[DnskeyData],
    ) -> Result<(), MusicError> {
        Ok(())
    }
    async fn get_zone_dnskeys(
        &self,
        _zone: &str,
        _signer: &str,
    ) -> Result<Vec<DnskeyData>, MusicError> {
        Ok(vec![])
    }
}

struct StubSignerRepository;

#[async_trait]
impl SignerRepository for StubSignerRepository {
    async fn add_signer(&self, _signer: &Signer) -> Result<(), MusicError> {
        Ok(())
    }
    async fn get_signer(&self, _name: &str) -> Result<Option<Signer>, MusicError> {
        Ok(None)
    }
    async fn list_signers(&self) -> Result<Vec<Signer>, MusicError> {
        Ok(vec![])
    }
    async fn update_signer(&self, _signer: &Signer) -> Result<(), MusicError> {
        Ok(())
    }
    async fn delete_signer(&self, _name: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn signers_in_group(&self, _group: &str) -> Result<Vec<Signer>, MusicError> {
        Ok(vec![])
    }
}

struct StubGroupRepository;

#[async_trait]
impl GroupRepository for StubGroupRepository {
    async fn add_group(&self, name: &str) -> Result<SignerGroup, MusicError> {
        Ok(SignerGroup::new(name.to_string()))
    }
    async fn get_group(&self, _name: &str) -> Result<Option<SignerGroup>, MusicError> {
        Ok(None)
    }
    async fn list_groups(&self) -> Result<Vec<SignerGroup>, MusicError> {
        Ok(vec![])
    }
    async fn delete_group(&self, _name: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn add_signer_to_group(&self, _group: &str, _signer: &str) -> Result<(), MusicError> {
        Ok(())
    }
    async fn remove_signer_from_group(
        &self,
        _group: &str,
        _signer: &str,
    ) -> Result<(), MusicError> {
        Ok(())
    }
    async fn lock_for_process(
        &self,
        _group: &str,
        _process: &str,
        _pending_addition: Option<&str>,
        _pending_removal: Option<&str>,
    ) -> Result<(), MusicError> {
        Ok(())
    }
    async fn check_if_process_complete(&self, _group: &str) -> Result<bool, MusicError> {
        Ok(false)
    }
}

struct StubSignerOps;

#[async_trait]
impl SignerOps for StubSignerOps {
    async fn fetch_rrset(
        &self,
        _signer: &Signer,
        _zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        Ok(Rrset::new(owner.to_string(), rtype, 0))
    }
    async fn update_rrsets(
        &self,
        _signer: &Signer,
        _zone: &str,
        _owner: &str,
        _inserts: &[Rrset],
        _removes: &[Rrset],
    ) -> Result<(), MusicError> {
        Ok(())
    }
}

struct StubDnsLookup;

#[async_trait]
impl DnsLookup for StubDnsLookup {
    async fn query(&self, name: &str, rtype: RecordType) -> Result<Rrset, MusicError> {
        Ok(Rrset::new(name.to_string(), rtype, 0))
    }
    async fn query_at(
        &self,
        _server: &str,
        name: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        Ok(Rrset::new(name.to_string(), rtype, 0))
    }
}

pub fn stub_engine(zones: Arc<StubZoneRepository>, intervals: FsmIntervals) -> Arc<FsmEngine> {
    let ctx = FsmContext {
        zones,
        signers: Arc::new(StubSignerRepository),
        groups: Arc::new(StubGroupRepository),
        ops: Arc::new(StubSignerOps),
        lookup: Arc::new(StubDnsLookup),
    };
    Arc::new(FsmEngine::new(
        ctx,
        Arc::new(ProcessRegistry::new()),
        intervals,
    ))
}
