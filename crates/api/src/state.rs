use chrono::{DateTime, Utc};
use dashmap::DashMap;
use music_application::fsm::{EngineCheck, FsmEngine};
use music_application::ports::{DnsLookup, PeerDirectory, SignerOps, SignerRepository, ZoneRepository};
use music_application::services::HelloService;
use music_application::use_cases::{
    AddGroupUseCase, AddSignerUseCase, AddZoneUseCase, DeleteGroupUseCase, DeleteSignerUseCase,
    DeleteZoneUseCase, ListGroupsUseCase, ListSignersUseCase, ListZonesUseCase,
    SetZoneMetaUseCase, SignerJoinGroupUseCase, SignerLeaveGroupUseCase, StepFsmUseCase,
    UpdateSignerUseCase, ZoneJoinGroupUseCase, ZoneLeaveGroupUseCase,
};
use music_domain::{Config, KeyData, TlsaData};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    // Zones
    pub add_zone: Arc<AddZoneUseCase>,
    pub delete_zone: Arc<DeleteZoneUseCase>,
    pub list_zones: Arc<ListZonesUseCase>,
    pub zone_join_group: Arc<ZoneJoinGroupUseCase>,
    pub zone_leave_group: Arc<ZoneLeaveGroupUseCase>,
    pub step_fsm: Arc<StepFsmUseCase>,
    pub set_zone_meta: Arc<SetZoneMetaUseCase>,

    // Signers
    pub add_signer: Arc<AddSignerUseCase>,
    pub update_signer: Arc<UpdateSignerUseCase>,
    pub delete_signer: Arc<DeleteSignerUseCase>,
    pub list_signers: Arc<ListSignersUseCase>,
    pub signer_join_group: Arc<SignerJoinGroupUseCase>,
    pub signer_leave_group: Arc<SignerLeaveGroupUseCase>,

    // Groups
    pub add_group: Arc<AddGroupUseCase>,
    pub delete_group: Arc<DeleteGroupUseCase>,
    pub list_groups: Arc<ListGroupsUseCase>,

    // Engine and sync plumbing
    pub engine: Arc<FsmEngine>,
    pub engine_checks: mpsc::Sender<EngineCheck>,
    pub directory: Arc<dyn PeerDirectory>,
    pub hello_service: Arc<HelloService>,
    pub zones: Arc<dyn ZoneRepository>,
    pub signers: Arc<dyn SignerRepository>,
    pub ops: Arc<dyn SignerOps>,
    pub lookup: Arc<dyn DnsLookup>,

    // Operator-managed trust material: SIG(0) public keys by identity
    // and extra TLSA anchors by identity.
    pub keystore: Arc<DashMap<String, KeyData>>,
    pub truststore: Arc<DashMap<String, TlsaData>>,

    pub config: Arc<Config>,
    pub api_key: Option<String>,
    pub started_at: DateTime<Utc>,
    pub shutdown: CancellationToken,
}
