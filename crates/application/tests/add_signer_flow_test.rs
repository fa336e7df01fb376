//! End-to-end add-signer process against in-memory signers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use music_application::fsm::processes::{default_registry, support::META_PARENT_ADDR};
use music_application::fsm::{EvalOutcome, FsmContext, FsmEngine, TransitionStep};
use music_application::use_cases::SignerJoinGroupUseCase;
use music_domain::config::FsmIntervals;
use music_domain::{
    DnskeyData, FsmMode, MusicError, RecordData, RecordType, Rrset, Signer, SignerAuth, SoaData,
    UpdateMethod, Zone, ZoneType,
};
use std::sync::Arc;
use tokio::sync::mpsc;

mod helpers;
use helpers::{MockDnsLookup, MockSignerOps, MockStore};

const ZONE: &str = "example.com.";

fn ksk(seed: u8) -> DnskeyData {
    DnskeyData {
        flags: 257,
        protocol: 3,
        algorithm: 13,
        public_key: BASE64.encode([seed; 32]),
    }
}

fn signer(name: &str) -> Signer {
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

fn soa_rrset(serial: u32) -> Rrset {
    Rrset::with_records(
        ZONE.into(),
        RecordType::SOA,
        3600,
        vec![RecordData::Soa(SoaData {
            mname: "ns1.example.com.".into(),
            rname: "hostmaster.example.com.".into(),
            serial,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum: 3600,
        })],
    )
}

struct Flow {
    store: Arc<MockStore>,
    ops: Arc<MockSignerOps>,
    lookup: Arc<MockDnsLookup>,
    engine: FsmEngine,
    checks: mpsc::Receiver<music_application::fsm::EngineCheck>,
    join: SignerJoinGroupUseCase,
    key_a: DnskeyData,
    key_b: DnskeyData,
}

async fn flow() -> Flow {
    let store = Arc::new(MockStore::new());
    let ops = Arc::new(MockSignerOps::new());
    let lookup = Arc::new(MockDnsLookup::new());

    let ctx = FsmContext {
        zones: store.clone(),
        signers: store.clone(),
        groups: store.clone(),
        ops: ops.clone(),
        lookup: lookup.clone(),
    };
    let engine = FsmEngine::new(
        ctx,
        Arc::new(default_registry().unwrap()),
        FsmIntervals::default(),
    );

    use music_application::ports::{GroupRepository, SignerRepository, ZoneRepository};

    // Group g1 serving example.com. with signer A only.
    store.add_signer(&signer("signer-a")).await.unwrap();
    store.add_signer(&signer("signer-b")).await.unwrap();
    store.add_group("g1").await.unwrap();
    store.add_signer_to_group("g1", "signer-a").await.unwrap();

    let zone = Zone::new(ZONE.into(), ZoneType::Normal, FsmMode::Auto);
    store.add_zone(&zone).await.unwrap();
    store.zone_join_group(ZONE, "g1").await.unwrap();
    store
        .set_meta(ZONE, META_PARENT_ADDR, "192.0.2.53:53")
        .await
        .unwrap();

    let key_a = ksk(1);
    let key_b = ksk(2);

    // Signer A's current view of the zone.
    ops.seed(
        "signer-a",
        Rrset::with_records(
            ZONE.into(),
            RecordType::DNSKEY,
            3600,
            vec![RecordData::Dnskey(key_a.clone())],
        ),
    );
    ops.seed(
        "signer-a",
        Rrset::with_records(
            ZONE.into(),
            RecordType::NS,
            3600,
            vec![RecordData::Ns("ns1.signer-a.example.".into())],
        ),
    );
    ops.seed("signer-a", soa_rrset(100));

    // Signer B holds its own keys and NS, not yet merged.
    ops.seed(
        "signer-b",
        Rrset::with_records(
            ZONE.into(),
            RecordType::DNSKEY,
            3600,
            vec![RecordData::Dnskey(key_b.clone())],
        ),
    );
    ops.seed(
        "signer-b",
        Rrset::with_records(
            ZONE.into(),
            RecordType::NS,
            3600,
            vec![RecordData::Ns("ns1.signer-b.example.".into())],
        ),
    );
    ops.seed("signer-b", soa_rrset(200));

    // Parent zone already carries DS for both KSKs and the merged NS set,
    // so the wait states pass on first poll.
    lookup.set_answer(
        ZONE,
        Rrset::with_records(
            ZONE.into(),
            RecordType::DS,
            3600,
            vec![
                RecordData::Ds(music_domain::CdsData {
                    key_tag: key_a.key_tag().unwrap(),
                    algorithm: 13,
                    digest_type: 2,
                    digest: "00".repeat(32),
                }),
                RecordData::Ds(music_domain::CdsData {
                    key_tag: key_b.key_tag().unwrap(),
                    algorithm: 13,
                    digest_type: 2,
                    digest: "11".repeat(32),
                }),
            ],
        ),
    );
    lookup.set_answer(
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

    let (tx, checks) = mpsc::channel(16);
    let join = SignerJoinGroupUseCase::new(store.clone(), store.clone(), store.clone(), tx);

    Flow {
        store,
        ops,
        lookup,
        engine,
        checks,
        join,
        key_a,
        key_b,
    }
}

async fn drive_to_completion(flow: &Flow) -> usize {
    for hops in 1..=16 {
        match flow.engine.evaluate(ZONE, None).await.unwrap() {
            EvalOutcome::Completed { .. } => return hops,
            EvalOutcome::Advanced { .. } => {}
            other => panic!("unexpected outcome at hop {}: {:?}", hops, other),
        }
    }
    panic!("add-signer did not complete");
}

#[tokio::test]
async fn join_new_signer_completes_and_merges_dnskeys() {
    let mut flow = flow().await;

    flow.join.execute("signer-b", "g1").await.unwrap();
    assert!(flow.checks.recv().await.is_some());

    // The zone entered the process at its initial state.
    let zone = flow.store.zone_snapshot(ZONE).unwrap();
    assert_eq!(zone.fsm, "add-signer");
    assert_eq!(zone.state, "unsynced");
    assert!(flow.store.group_snapshot("g1").unwrap().locked);

    let hops = drive_to_completion(&flow).await;
    assert_eq!(hops, 7);

    // Zone detached, group unlocked, pending addition applied.
    let zone = flow.store.zone_snapshot(ZONE).unwrap();
    assert!(zone.fsm.is_empty());
    assert!(zone.stop_reason.is_none());
    let group = flow.store.group_snapshot("g1").unwrap();
    assert!(!group.locked);
    assert!(group.pending_addition.is_none());
    assert!(group.contains("signer-b"));

    // Both signers serve the DNSKEY union.
    for name in ["signer-a", "signer-b"] {
        let served = flow.ops.served(name, ZONE, RecordType::DNSKEY).unwrap();
        assert!(served.contains(&RecordData::Dnskey(flow.key_a.clone())));
        assert!(served.contains(&RecordData::Dnskey(flow.key_b.clone())));
        assert_eq!(served.len(), 2);
    }

    // Signalling records were retracted on the way out.
    assert!(flow
        .ops
        .served("signer-a", ZONE, RecordType::CSYNC)
        .is_none());
    assert!(flow.ops.served("signer-a", ZONE, RecordType::CDS).is_none());
}

#[tokio::test]
async fn transient_update_failure_blocks_then_recovers() {
    let mut flow = flow().await;
    flow.join.execute("signer-b", "g1").await.unwrap();
    let _ = flow.checks.recv().await;

    flow.ops.fail_next_update(
        "signer-b",
        MusicError::SignerOpFailed {
            signer: "signer-b".into(),
            detail: "DNSKEY UPDATE failed: 500 Internal Server Error".into(),
        },
    );

    // First evaluation hits the failing backend and blocks in place.
    let outcome = flow.engine.evaluate(ZONE, None).await.unwrap();
    let EvalOutcome::Blocked { reason } = outcome else {
        panic!("expected blocked");
    };
    assert!(reason.contains("DNSKEY UPDATE failed"));

    let zone = flow.store.zone_snapshot(ZONE).unwrap();
    assert_eq!(zone.state, "unsynced");
    assert!(zone.stop_reason.unwrap().contains("DNSKEY UPDATE failed"));

    // Backend healed: the process runs to completion.
    let hops = drive_to_completion(&flow).await;
    assert_eq!(hops, 7);
}

#[tokio::test]
async fn completed_sync_action_is_idempotent() {
    let mut flow = flow().await;
    flow.join.execute("signer-b", "g1").await.unwrap();
    let _ = flow.checks.recv().await;
    drive_to_completion(&flow).await;

    let ctx = FsmContext {
        zones: flow.store.clone(),
        signers: flow.store.clone(),
        groups: flow.store.clone(),
        ops: flow.ops.clone(),
        lookup: flow.lookup.clone(),
    };
    let zone = flow.store.zone_snapshot(ZONE).unwrap();

    let updates_before = flow.ops.update_calls.lock().unwrap().len();
    let before_a = flow.ops.served("signer-a", ZONE, RecordType::DNSKEY);

    // Re-running the sync action against an already-synced group must not
    // touch any signer.
    let step = music_application::fsm::processes::steps::SyncDnskeys;
    step.action(&ctx, &zone).await.unwrap();
    assert!(step.post_condition(&ctx, &zone).await.unwrap());

    assert_eq!(flow.ops.update_calls.lock().unwrap().len(), updates_before);
    assert_eq!(flow.ops.served("signer-a", ZONE, RecordType::DNSKEY), before_a);
}
