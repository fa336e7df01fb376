//! Dependency wiring: repositories into queues, engine, sync machinery,
//! jobs and the API state.

use chrono::Utc;
use dashmap::DashMap;
use music_api::AppState;
use music_application::fsm::processes::default_registry;
use music_application::fsm::{EngineCheck, FsmContext, FsmEngine};
use music_application::ports::{
    DnsLookup, GroupRepository, PeerDirectory, SignerOps, SignerRepository, ZoneRepository,
};
use music_application::services::HelloService;
use music_application::use_cases::{
    AddGroupUseCase, AddSignerUseCase, AddZoneUseCase, DeleteGroupUseCase, DeleteSignerUseCase,
    DeleteZoneUseCase, ListGroupsUseCase, ListSignersUseCase, ListZonesUseCase,
    SetZoneMetaUseCase, SignerJoinGroupUseCase, SignerLeaveGroupUseCase, StepFsmUseCase,
    UpdateSignerUseCase, ZoneJoinGroupUseCase, ZoneLeaveGroupUseCase,
};
use music_domain::Config;
use music_infrastructure::dns::HickoryDnsLookup;
use music_infrastructure::queue::{UpdaterDispatcher, UpdaterRegistry};
use music_infrastructure::repositories::{
    SqliteGroupRepository, SqliteSignerRepository, SqliteZoneRepository,
};
use music_infrastructure::store::{DurableWriter, StopReasonCache};
use music_infrastructure::sync::dns_transport::{DnsBeatSender, Sig0Signer};
use music_infrastructure::sync::{HsyncDiscovery, PeerMembership, SidecarApiClient};
use music_jobs::{
    DiscoveryScanJob, FsmTickerJob, FullHeartbeatJob, HeartbeatJob, HelloEvalJob, JobRunner,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::database::DbPools;

const ENGINE_CHECK_CAPACITY: usize = 1024;

pub struct App {
    pub state: AppState,
    pub engine: Arc<FsmEngine>,
    pub engine_checks_rx: mpsc::Receiver<EngineCheck>,
    pub discovery: Arc<HsyncDiscovery>,
    pub shutdown: CancellationToken,
}

pub async fn build(
    config: Config,
    pools: DbPools,
    shutdown: CancellationToken,
) -> anyhow::Result<App> {
    let config = Arc::new(config);

    // Store: durable writer first, repositories on top of it.
    let stop_reasons: StopReasonCache = Arc::new(DashMap::new());
    let durable = DurableWriter::spawn(pools.write.clone(), stop_reasons.clone(), shutdown.clone());

    let zones: Arc<dyn ZoneRepository> = Arc::new(SqliteZoneRepository::new(
        pools.read.clone(),
        pools.write.clone(),
        durable,
        stop_reasons,
    ));
    let signers: Arc<dyn SignerRepository> = Arc::new(SqliteSignerRepository::new(
        pools.read.clone(),
        pools.write.clone(),
    ));
    let groups: Arc<dyn GroupRepository> = Arc::new(SqliteGroupRepository::new(
        pools.read.clone(),
        pools.write.clone(),
    ));

    // Signers from the config file are upserted at boot.
    for signer in &config.signers {
        match signers.get_signer(&signer.name).await? {
            Some(_) => signers.update_signer(signer).await?,
            None => signers.add_signer(signer).await?,
        }
    }

    // Signer operations: updater registry behind the rate-limited queues.
    let registry = UpdaterRegistry::with_defaults()?;
    let ops: Arc<dyn SignerOps> = Arc::new(UpdaterDispatcher::spawn(&registry, shutdown.clone()));

    let resolver: std::net::SocketAddr = config.resolver.address.parse()?;
    let lookup: Arc<dyn DnsLookup> = Arc::new(HickoryDnsLookup::new(resolver));

    // FSM engine.
    let ctx = FsmContext {
        zones: zones.clone(),
        signers: signers.clone(),
        groups: groups.clone(),
        ops: ops.clone(),
        lookup: lookup.clone(),
    };
    let engine = Arc::new(FsmEngine::new(
        ctx,
        Arc::new(default_registry()?),
        config.fsmengine.intervals.clone(),
    ));
    let (engine_checks_tx, engine_checks_rx) = mpsc::channel(ENGINE_CHECK_CAPACITY);

    // Peer sync machinery.
    let directory: Arc<dyn PeerDirectory> = Arc::new(PeerMembership::new());
    let identity = config.sidecar.identity.clone();
    let (cert_path, key_path) = match &config.sidecar.api {
        Some(api) => (Some(api.cert_file.clone()), Some(api.key_file.clone())),
        None => (None, None),
    };
    let api_client = Arc::new(SidecarApiClient::new(identity.clone(), cert_path, key_path));

    let sig0 = match &config.sidecar.dns {
        Some(dns) => match Sig0Signer::from_bind_file(&dns.key_file, &identity) {
            Ok(signer) => Some(signer),
            Err(e) => {
                warn!(error = %e, "SIG(0) key unavailable, DNS-method beats disabled");
                None
            }
        },
        None => None,
    };
    let dns_sender = Arc::new(DnsBeatSender::new(sig0));

    let hello_service = Arc::new(HelloService::new(
        directory.clone(),
        lookup.clone(),
        identity.clone(),
    ));
    let discovery = Arc::new(HsyncDiscovery::new(
        lookup.clone(),
        directory.clone(),
        api_client.clone(),
        identity.clone(),
    ));

    // Use cases.
    let state = AppState {
        add_zone: Arc::new(AddZoneUseCase::new(zones.clone())),
        delete_zone: Arc::new(DeleteZoneUseCase::new(zones.clone(), groups.clone())),
        list_zones: Arc::new(ListZonesUseCase::new(zones.clone())),
        zone_join_group: Arc::new(ZoneJoinGroupUseCase::new(zones.clone(), groups.clone())),
        zone_leave_group: Arc::new(ZoneLeaveGroupUseCase::new(zones.clone(), groups.clone())),
        step_fsm: Arc::new(StepFsmUseCase::new(engine.clone())),
        set_zone_meta: Arc::new(SetZoneMetaUseCase::new(zones.clone())),

        add_signer: Arc::new(AddSignerUseCase::new(signers.clone())),
        update_signer: Arc::new(UpdateSignerUseCase::new(signers.clone())),
        delete_signer: Arc::new(DeleteSignerUseCase::new(signers.clone())),
        list_signers: Arc::new(ListSignersUseCase::new(signers.clone())),
        signer_join_group: Arc::new(SignerJoinGroupUseCase::new(
            zones.clone(),
            signers.clone(),
            groups.clone(),
            engine_checks_tx.clone(),
        )),
        signer_leave_group: Arc::new(SignerLeaveGroupUseCase::new(
            zones.clone(),
            signers.clone(),
            groups.clone(),
            engine_checks_tx.clone(),
        )),

        add_group: Arc::new(AddGroupUseCase::new(groups.clone())),
        delete_group: Arc::new(DeleteGroupUseCase::new(groups.clone())),
        list_groups: Arc::new(ListGroupsUseCase::new(groups.clone())),

        engine: engine.clone(),
        engine_checks: engine_checks_tx.clone(),
        directory: directory.clone(),
        hello_service: hello_service.clone(),
        zones: zones.clone(),
        signers: signers.clone(),
        ops: ops.clone(),
        lookup: lookup.clone(),

        keystore: Arc::new(DashMap::new()),
        truststore: Arc::new(DashMap::new()),

        api_key: config.apiserver.api_key.clone(),
        config: config.clone(),
        started_at: Utc::now(),
        shutdown: shutdown.clone(),
    };

    // Background tickers.
    let intervals = config.syncengine.intervals.clone();
    JobRunner::new()
        .with_fsm_ticker(
            FsmTickerJob::new(
                zones.clone(),
                engine.clone(),
                engine_checks_tx,
                config.fsmengine.intervals.clone(),
            )
            .with_cancellation(shutdown.clone()),
        )
        .with_heartbeat(
            HeartbeatJob::new(
                directory.clone(),
                api_client.clone(),
                dns_sender.clone(),
                identity.clone(),
                intervals.heartbeat,
            )
            .with_cancellation(shutdown.clone()),
        )
        .with_full_heartbeat(
            FullHeartbeatJob::new(
                directory.clone(),
                api_client.clone(),
                dns_sender.clone(),
                identity.clone(),
                intervals.fullbeat,
            )
            .with_cancellation(shutdown.clone()),
        )
        .with_hello_eval(
            HelloEvalJob::new(hello_service, intervals.helloeval)
                .with_cancellation(shutdown.clone()),
        )
        .with_discovery_scan(
            DiscoveryScanJob::new(
                zones.clone(),
                directory.clone(),
                discovery.clone(),
                intervals.fullbeat,
            )
            .with_cancellation(shutdown.clone()),
        )
        .start()
        .await;

    info!("Application wired");
    Ok(App {
        state,
        engine,
        engine_checks_rx,
        discovery,
        shutdown,
    })
}
