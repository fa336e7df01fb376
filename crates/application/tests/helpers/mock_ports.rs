//! In-memory port implementations for engine and use-case tests.

use async_trait::async_trait;
use chrono::Utc;
use music_application::ports::{
    DnsLookup, GroupRepository, PeerDirectory, SignerOps, SignerRepository, Wannabe,
    ZoneRepository,
};
use music_domain::{
    DnskeyData, FsmStatus, MusicError, RecordType, Rrset, Sidecar, Signer, SignerGroup, Zone,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct StoreInner {
    zones: HashMap<String, Zone>,
    signers: HashMap<String, Signer>,
    groups: HashMap<String, SignerGroup>,
    meta: HashMap<(String, String), String>,
    zone_nses: HashMap<(String, String), Vec<String>>,
    zone_dnskeys: HashMap<(String, String), Vec<DnskeyData>>,
}

/// One in-memory store implementing all three repositories with the same
/// locking and compare-and-set semantics as the SQLite implementation.
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<StoreInner>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone_snapshot(&self, name: &str) -> Option<Zone> {
        self.inner.lock().unwrap().zones.get(name).cloned()
    }

    pub fn group_snapshot(&self, name: &str) -> Option<SignerGroup> {
        self.inner.lock().unwrap().groups.get(name).cloned()
    }
}

#[async_trait]
impl ZoneRepository for MockStore {
    async fn add_zone(&self, zone: &Zone) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.zones.contains_key(&zone.name) {
            return Err(MusicError::Database(format!(
                "zone '{}' already exists",
                zone.name
            )));
        }
        inner.zones.insert(zone.name.clone(), zone.clone());
        Ok(())
    }

    async fn get_zone(&self, name: &str) -> Result<Option<Zone>, MusicError> {
        Ok(self.inner.lock().unwrap().zones.get(name).cloned())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, MusicError> {
        Ok(self.inner.lock().unwrap().zones.values().cloned().collect())
    }

    async fn list_auto_zones(&self) -> Result<Vec<Zone>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .zones
            .values()
            .filter(|z| z.fsm_mode == music_domain::FsmMode::Auto)
            .cloned()
            .collect())
    }

    async fn update_zone(&self, zone: &Zone) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .zones
            .insert(zone.name.clone(), zone.clone());
        Ok(())
    }

    async fn delete_zone(&self, name: &str) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .zones
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MusicError::ZoneNotFound(name.to_string()))
    }

    async fn attach_fsm(
        &self,
        zone: &str,
        process: &str,
        initial_state: &str,
        preempt: bool,
    ) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let z = inner
            .zones
            .get_mut(zone)
            .ok_or_else(|| MusicError::ZoneNotFound(zone.to_string()))?;
        if !z.fsm.is_empty() && !preempt {
            return Err(MusicError::AlreadyAttached {
                zone: zone.to_string(),
                process: z.fsm.clone(),
            });
        }
        z.fsm = process.to_string();
        z.state = initial_state.to_string();
        z.fsm_status = FsmStatus::None;
        z.stop_reason = None;
        z.state_timestamp = Utc::now();
        Ok(())
    }

    async fn detach_fsm(&self, zone: &str, process: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let z = inner
            .zones
            .get_mut(zone)
            .ok_or_else(|| MusicError::ZoneNotFound(zone.to_string()))?;
        if z.fsm != process {
            return Err(MusicError::NotAttached {
                zone: zone.to_string(),
                process: process.to_string(),
            });
        }
        z.fsm.clear();
        z.state.clear();
        z.fsm_status = FsmStatus::None;
        z.stop_reason = None;
        Ok(())
    }

    async fn state_transition(&self, zone: &str, from: &str, to: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let z = inner
            .zones
            .get_mut(zone)
            .ok_or_else(|| MusicError::ZoneNotFound(zone.to_string()))?;
        if z.state != from {
            return Err(MusicError::StateMismatch {
                zone: zone.to_string(),
                expected: from.to_string(),
                actual: z.state.clone(),
            });
        }
        z.state = to.to_string();
        z.stop_reason = None;
        z.fsm_status = FsmStatus::None;
        z.state_timestamp = Utc::now();
        Ok(())
    }

    async fn set_fsm_status(&self, zone: &str, status: FsmStatus) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(z) = inner.zones.get_mut(zone) {
            z.fsm_status = status;
        }
        Ok(())
    }

    async fn set_stop_reason(&self, zone: &str, reason: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let z = inner
            .zones
            .get_mut(zone)
            .ok_or_else(|| MusicError::ZoneNotFound(zone.to_string()))?;
        z.stop_reason = Some(reason.to_string());
        z.fsm_status = FsmStatus::Blocked;
        Ok(())
    }

    async fn get_stop_reason(&self, zone: &str) -> Result<Option<String>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .zones
            .get(zone)
            .and_then(|z| z.stop_reason.clone()))
    }

    async fn zone_join_group(&self, zone: &str, group: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let locked = inner
            .groups
            .get(group)
            .ok_or_else(|| MusicError::GroupNotFound(group.to_string()))?
            .locked;
        if locked {
            return Err(MusicError::GroupLocked(group.to_string()));
        }
        let z = inner
            .zones
            .get_mut(zone)
            .ok_or_else(|| MusicError::ZoneNotFound(zone.to_string()))?;
        z.signer_group = Some(group.to_string());
        if let Some(g) = inner.groups.get_mut(group) {
            g.num_zones += 1;
        }
        Ok(())
    }

    async fn zone_leave_group(&self, zone: &str, group: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let locked = inner
            .groups
            .get(group)
            .ok_or_else(|| MusicError::GroupNotFound(group.to_string()))?
            .locked;
        if locked {
            return Err(MusicError::GroupLocked(group.to_string()));
        }
        let z = inner
            .zones
            .get_mut(zone)
            .ok_or_else(|| MusicError::ZoneNotFound(zone.to_string()))?;
        z.signer_group = None;
        if let Some(g) = inner.groups.get_mut(group) {
            g.num_zones = g.num_zones.saturating_sub(1);
        }
        Ok(())
    }

    async fn get_meta(&self, zone: &str, key: &str) -> Result<Option<String>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .meta
            .get(&(zone.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_meta(&self, zone: &str, key: &str, value: &str) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .meta
            .insert((zone.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn set_zone_nses(
        &self,
        zone: &str,
        signer: &str,
        nses: &[String],
    ) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .zone_nses
            .insert((zone.to_string(), signer.to_string()), nses.to_vec());
        Ok(())
    }

    async fn get_zone_nses(&self, zone: &str, signer: &str) -> Result<Vec<String>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .zone_nses
            .get(&(zone.to_string(), signer.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_zone_dnskeys(
        &self,
        zone: &str,
        signer: &str,
        keys: &[DnskeyData],
    ) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .zone_dnskeys
            .insert((zone.to_string(), signer.to_string()), keys.to_vec());
        Ok(())
    }

    async fn get_zone_dnskeys(
        &self,
        zone: &str,
        signer: &str,
    ) -> Result<Vec<DnskeyData>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .zone_dnskeys
            .get(&(zone.to_string(), signer.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SignerRepository for MockStore {
    async fn add_signer(&self, signer: &Signer) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .signers
            .insert(signer.name.clone(), signer.clone());
        Ok(())
    }

    async fn get_signer(&self, name: &str) -> Result<Option<Signer>, MusicError> {
        Ok(self.inner.lock().unwrap().signers.get(name).cloned())
    }

    async fn list_signers(&self) -> Result<Vec<Signer>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .signers
            .values()
            .cloned()
            .collect())
    }

    async fn update_signer(&self, signer: &Signer) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .signers
            .insert(signer.name.clone(), signer.clone());
        Ok(())
    }

    async fn delete_signer(&self, name: &str) -> Result<(), MusicError> {
        self.inner
            .lock()
            .unwrap()
            .signers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MusicError::SignerNotFound(name.to_string()))
    }

    async fn signers_in_group(&self, group: &str) -> Result<Vec<Signer>, MusicError> {
        let inner = self.inner.lock().unwrap();
        let Some(g) = inner.groups.get(group) else {
            return Err(MusicError::GroupNotFound(group.to_string()));
        };
        Ok(g.signers
            .iter()
            .filter_map(|name| inner.signers.get(name).cloned())
            .collect())
    }
}

#[async_trait]
impl GroupRepository for MockStore {
    async fn add_group(&self, name: &str) -> Result<SignerGroup, MusicError> {
        let group = SignerGroup::new(name.to_string());
        self.inner
            .lock()
            .unwrap()
            .groups
            .insert(name.to_string(), group.clone());
        Ok(group)
    }

    async fn get_group(&self, name: &str) -> Result<Option<SignerGroup>, MusicError> {
        Ok(self.inner.lock().unwrap().groups.get(name).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<SignerGroup>, MusicError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .groups
            .values()
            .cloned()
            .collect())
    }

    async fn delete_group(&self, name: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.groups.get(name) {
            Some(g) if g.locked => Err(MusicError::GroupLocked(name.to_string())),
            Some(_) => {
                inner.groups.remove(name);
                Ok(())
            }
            None => Err(MusicError::GroupNotFound(name.to_string())),
        }
    }

    async fn add_signer_to_group(&self, group: &str, signer: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let g = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| MusicError::GroupNotFound(group.to_string()))?;
        if !g.signers.iter().any(|s| s == signer) {
            g.signers.push(signer.to_string());
        }
        Ok(())
    }

    async fn remove_signer_from_group(&self, group: &str, signer: &str) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let g = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| MusicError::GroupNotFound(group.to_string()))?;
        g.signers.retain(|s| s != signer);
        Ok(())
    }

    async fn lock_for_process(
        &self,
        group: &str,
        process: &str,
        pending_addition: Option<&str>,
        pending_removal: Option<&str>,
    ) -> Result<(), MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let g = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| MusicError::GroupNotFound(group.to_string()))?;
        if g.locked {
            return Err(MusicError::GroupLocked(group.to_string()));
        }
        g.locked = true;
        g.current_process = process.to_string();
        g.pending_addition = pending_addition.map(str::to_string);
        g.pending_removal = pending_removal.map(str::to_string);
        Ok(())
    }

    async fn check_if_process_complete(&self, group: &str) -> Result<bool, MusicError> {
        let mut inner = self.inner.lock().unwrap();
        let process = match inner.groups.get(group) {
            Some(g) if g.locked => g.current_process.clone(),
            _ => return Ok(false),
        };
        let still_running = inner
            .zones
            .values()
            .any(|z| z.signer_group.as_deref() == Some(group) && z.fsm == process);
        if still_running {
            return Ok(false);
        }
        let pending_removal = inner.groups.get(group).unwrap().pending_removal.clone();
        let g = inner.groups.get_mut(group).unwrap();
        g.locked = false;
        g.current_process.clear();
        g.pending_addition = None;
        g.pending_removal = None;
        if let Some(leaving) = pending_removal {
            g.signers.retain(|s| s != &leaving);
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------

type RrsetKey = (String, String, u16);

/// In-memory signer backend: serves and mutates RRsets per signer, with
/// optional one-shot update failures to model transient backend errors.
#[derive(Default)]
pub struct MockSignerOps {
    sets: Mutex<HashMap<RrsetKey, Rrset>>,
    fail_update_once: Mutex<HashMap<String, MusicError>>,
    pub update_calls: Mutex<Vec<String>>,
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

    /// The next update against `signer` fails with `error`.
    pub fn fail_next_update(&self, signer: &str, error: MusicError) {
        self.fail_update_once
            .lock()
            .unwrap()
            .insert(signer.to_string(), error);
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
        if let Some(error) = self.fail_update_once.lock().unwrap().remove(&signer.name) {
            return Err(error);
        }
        self.update_calls.lock().unwrap().push(signer.name.clone());

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

// ---------------------------------------------------------------------------

/// In-memory DNS view for recursive and parent lookups.
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

// ---------------------------------------------------------------------------

/// In-memory peer directory for sync-service tests.
#[derive(Default)]
pub struct MockDirectory {
    peers: Mutex<HashMap<String, Sidecar>>,
    wannabes: Mutex<Vec<Wannabe>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeerDirectory for MockDirectory {
    fn peers(&self) -> Vec<Sidecar> {
        self.peers.lock().unwrap().values().cloned().collect()
    }

    fn get(&self, identity: &str) -> Option<Sidecar> {
        self.peers.lock().unwrap().get(identity).cloned()
    }

    fn upsert(&self, peer: Sidecar) {
        self.peers
            .lock()
            .unwrap()
            .insert(peer.identity.clone(), peer);
    }

    fn remove(&self, identity: &str) -> Option<Sidecar> {
        self.peers.lock().unwrap().remove(identity)
    }

    fn record_beat(&self, identity: &str, shared_zones: Option<BTreeSet<String>>) -> bool {
        let mut peers = self.peers.lock().unwrap();
        match peers.get_mut(identity) {
            Some(peer) => {
                peer.last_beat = Some(Utc::now());
                if let Some(zones) = shared_zones {
                    peer.shared_zones = zones;
                }
                true
            }
            None => false,
        }
    }

    fn set_zone_shared(&self, identity: &str, zone: &str, shared: bool) {
        let mut peers = self.peers.lock().unwrap();
        if let Some(peer) = peers.get_mut(identity) {
            if shared {
                peer.shared_zones.insert(zone.to_string());
            } else {
                peer.shared_zones.remove(zone);
            }
        }
    }

    fn add_wannabe(&self, wannabe: Wannabe) {
        self.wannabes.lock().unwrap().push(wannabe);
    }

    fn take_wannabes(&self) -> Vec<Wannabe> {
        std::mem::take(&mut *self.wannabes.lock().unwrap())
    }
}
