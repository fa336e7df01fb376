//! Full-stack flows: real SQLite store and engine, in-memory signers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dashmap::DashMap;
use music_application::fsm::processes::default_registry;
use music_application::fsm::{EvalOutcome, FsmContext, FsmEngine};
use music_application::ports::{
    GroupRepository, SignerRepository, ZoneRepository,
};
use music_application::use_cases::{AddZoneUseCase, SignerJoinGroupUseCase, ZoneJoinGroupUseCase};
use music_domain::config::FsmIntervals;
use music_domain::{
    CdsData, DnskeyData, FsmMode, MusicError, RecordData, RecordType, Rrset, Signer, SignerAuth,
    UpdateMethod, ZoneType,
};
use music_infrastructure::database::create_test_pool;
use music_infrastructure::repositories::{
    SqliteGroupRepository, SqliteSignerRepository, SqliteZoneRepository,
};
use music_infrastructure::store::{DurableWriter, StopReasonCache};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

#[path = "../common/mod.rs"]
mod common;
use common::{soa_rrset, MockDnsLookup, MockSignerOps};

const ZONE: &str = "example.com.";

struct Stack {
    zones: Arc<SqliteZoneRepository>,
    signers: Arc<SqliteSignerRepository>,
    groups: Arc<SqliteGroupRepository>,
    ops: Arc<MockSignerOps>,
    lookup: Arc<MockDnsLookup>,
    engine: FsmEngine,
    checks: mpsc::Receiver<music_application::fsm::EngineCheck>,
    join: SignerJoinGroupUseCase,
    shutdown: CancellationToken,
}

fn ksk(seed: u8) -> DnskeyData {
    DnskeyData {
        flags: 257,
        protocol: 3,
        algorithm: 13,
        public_key: BASE64.encode([seed; 32]),
    }
}

fn ddns_signer(name: &str) -> Signer {
    Signer {
        name: name.to_string(),
        method: UpdateMethod::Ddns,
        address: "192.0.2.10".into(),
        port: 53,
        auth: SignerAuth::None,
        fetch_limit: 10,
        update_limit: 10,
    }
}

async fn stack() -> Stack {
    let pool = create_test_pool().await.unwrap();
    let cache: StopReasonCache = Arc::new(DashMap::new());
    let shutdown = CancellationToken::new();
    let durable = DurableWriter::spawn(pool.clone(), cache.clone(), shutdown.clone());

    let zones = Arc::new(SqliteZoneRepository::new(
        pool.clone(),
        pool.clone(),
        durable,
        cache,
    ));
    let signers = Arc::new(SqliteSignerRepository::new(pool.clone(), pool.clone()));
    let groups = Arc::new(SqliteGroupRepository::new(pool.clone(), pool.clone()));
    let ops = Arc::new(MockSignerOps::new());
    let lookup = Arc::new(MockDnsLookup::new());

    let ctx = FsmContext {
        zones: zones.clone(),
        signers: signers.clone(),
        groups: groups.clone(),
        ops: ops.clone(),
        lookup: lookup.clone(),
    };
    let engine = FsmEngine::new(
        ctx,
        Arc::new(default_registry().unwrap()),
        FsmIntervals::default(),
    );

    let (tx, checks) = mpsc::channel(16);
    let join = SignerJoinGroupUseCase::new(zones.clone(), signers.clone(), groups.clone(), tx);

    Stack {
        zones,
        signers,
        groups,
        ops,
        lookup,
        engine,
        checks,
        join,
        shutdown,
    }
}

async fn seed_two_signer_world(stack: &Stack) -> (DnskeyData, DnskeyData) {
    stack.signers.add_signer(&ddns_signer("signer-a")).await.unwrap();
    stack.signers.add_signer(&ddns_signer("signer-b")).await.unwrap();
    stack.groups.add_group("g1").await.unwrap();
    stack.groups.add_signer_to_group("g1", "signer-a").await.unwrap();

    let add_zone = AddZoneUseCase::new(stack.zones.clone());
    add_zone
        .execute(ZONE.into(), ZoneType::Normal, FsmMode::Auto)
        .await
        .unwrap();
    let join_zone = ZoneJoinGroupUseCase::new(stack.zones.clone(), stack.groups.clone());
    join_zone.execute(ZONE, "g1").await.unwrap();
    stack
        .zones
        .set_meta(ZONE, "parentaddr", "192.0.2.53:53")
        .await
        .unwrap();

    let key_a = ksk(1);
    let key_b = ksk(2);

    for (name, key, ns) in [
        ("signer-a", &key_a, "ns1.signer-a.example."),
        ("signer-b", &key_b, "ns1.signer-b.example."),
    ] {
        stack.ops.seed(
            name,
            Rrset::with_records(
                ZONE.into(),
                RecordType::DNSKEY,
                3600,
                vec![RecordData::Dnskey(key.clone())],
            ),
        );
        stack.ops.seed(
            name,
            Rrset::with_records(
                ZONE.into(),
                RecordType::NS,
                3600,
                vec![RecordData::Ns(ns.to_string())],
            ),
        );
        stack.ops.seed(name, soa_rrset(ZONE, 100));
    }

    // Parent already carries the target DS and NS sets.
    stack.lookup.set_answer(
        ZONE,
        Rrset::with_records(
            ZONE.into(),
            RecordType::DS,
            3600,
            vec![
                RecordData::Ds(CdsData {
                    key_tag: key_a.key_tag().unwrap(),
                    algorithm: 13,
                    digest_type: 2,
                    digest: "00".repeat(32),
                }),
                RecordData::Ds(CdsData {
                    key_tag: key_b.key_tag().unwrap(),
                    algorithm: 13,
                    digest_type: 2,
                    digest: "11".repeat(32),
                }),
            ],
        ),
    );
    stack.lookup.set_answer(
        ZONE,
        Rrset::with_records(
            ZONE.into(),
            RecordType::NS,
            3600,
            vec![
                RecordData::Ns("ns1.signer-a.example.".into()),
                RecordData::Ns("ns1.signer-b.example.".into()),
            ],
        ),
    );

    (key_a, key_b)
}

#[tokio::test]
async fn add_signer_flow_through_sqlite_store() {
    let mut stack = stack().await;
    let (key_a, key_b) = seed_two_signer_world(&stack).await;

    stack.join.execute("signer-b", "g1").await.unwrap();
    assert!(stack.checks.recv().await.is_some());

    // The lock and the attachment are durable.
    let group = stack.groups.get_group("g1").await.unwrap().unwrap();
    assert!(group.locked);
    assert_eq!(group.current_process, "add-signer");
    assert_eq!(group.pending_addition.as_deref(), Some("signer-b"));
    assert_eq!(group.num_process_zones, 1);

    // Drive the process to completion.
    let mut completed = false;
    for _ in 0..16 {
        // Contribution writes land on the writer channel between
        // transitions; give it a beat.
        sleep(Duration::from_millis(10)).await;
        match stack.engine.evaluate(ZONE, None).await.unwrap() {
            EvalOutcome::Completed { process } => {
                assert_eq!(process, "add-signer");
                completed = true;
                break;
            }
            EvalOutcome::Advanced { .. } => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert!(completed, "add-signer did not reach the terminal state");

    // Durable outcome: zone detached, group unlocked and extended.
    let zone = stack.zones.get_zone(ZONE).await.unwrap().unwrap();
    assert!(zone.fsm.is_empty());
    assert!(zone.stop_reason.is_none());

    let group = stack.groups.get_group("g1").await.unwrap().unwrap();
    assert!(!group.locked);
    assert!(group.pending_addition.is_none());
    assert!(group.contains("signer-a"));
    assert!(group.contains("signer-b"));
    assert_eq!(group.num_process_zones, 0);

    // Data plane: both signers serve the DNSKEY union, signalling
    // records are gone.
    for name in ["signer-a", "signer-b"] {
        let served = stack.ops.served(name, ZONE, RecordType::DNSKEY).unwrap();
        assert!(served.contains(&RecordData::Dnskey(key_a.clone())));
        assert!(served.contains(&RecordData::Dnskey(key_b.clone())));
    }
    assert!(stack.ops.served("signer-a", ZONE, RecordType::CSYNC).is_none());

    // The per-signer DNSKEY contributions were recorded for a later
    // remove-signer; they land through the durable writer.
    let mut recorded = Vec::new();
    for _ in 0..50 {
        recorded = stack
            .zones
            .get_zone_dnskeys(ZONE, "signer-b")
            .await
            .unwrap();
        if !recorded.is_empty() {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(recorded, vec![key_b]);

    stack.shutdown.cancel();
}

#[tokio::test]
async fn second_zone_cannot_join_locked_group() {
    let mut stack = stack().await;
    seed_two_signer_world(&stack).await;

    stack.join.execute("signer-b", "g1").await.unwrap();
    let _ = stack.checks.recv().await;

    let add_zone = AddZoneUseCase::new(stack.zones.clone());
    add_zone
        .execute("late.example.".into(), ZoneType::Normal, FsmMode::Auto)
        .await
        .unwrap();

    let join_zone = ZoneJoinGroupUseCase::new(stack.zones.clone(), stack.groups.clone());
    let err = join_zone.execute("late.example.", "g1").await.unwrap_err();
    assert!(matches!(err, MusicError::GroupLocked(_)));
    assert_eq!(err.to_string(), "signer group g1 locked");

    stack.shutdown.cancel();
}

#[tokio::test]
async fn blocked_zone_surfaces_stop_reason_in_store() {
    let mut stack = stack().await;
    seed_two_signer_world(&stack).await;

    // No parentaddr metadata: the wait-parent state will block later,
    // but an empty group stops immediately. Take the simpler route and
    // break the group instead.
    stack
        .groups
        .remove_signer_from_group("g1", "signer-a")
        .await
        .unwrap();
    stack.join.execute("signer-b", "g1").await.unwrap();
    let _ = stack.checks.recv().await;

    // signers_in_group now returns only signer-b; wipe it too so the
    // pre-condition records a stop-reason.
    stack
        .groups
        .remove_signer_from_group("g1", "signer-b")
        .await
        .unwrap();

    let outcome = stack.engine.evaluate(ZONE, None).await.unwrap();
    assert!(matches!(outcome, EvalOutcome::Blocked { .. }));

    // Read-your-writes, then durability.
    let reason = stack.zones.get_stop_reason(ZONE).await.unwrap();
    assert!(reason.unwrap().contains("no signers"));

    for _ in 0..50 {
        let zone = stack.zones.get_zone(ZONE).await.unwrap().unwrap();
        if zone.is_blocked() {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let zone = stack.zones.get_zone(ZONE).await.unwrap().unwrap();
    assert!(zone.is_blocked());
    assert_eq!(zone.state, "unsynced");

    stack.shutdown.cancel();
}
