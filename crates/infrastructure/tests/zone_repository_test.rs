//! SQLite repository semantics: compare-and-set transitions, group
//! locking and stop-reason read-your-writes.

use dashmap::DashMap;
use music_application::ports::{GroupRepository, ZoneRepository};
use music_domain::{DnskeyData, FsmMode, MusicError, Zone, ZoneType};
use music_infrastructure::database::create_test_pool;
use music_infrastructure::repositories::{SqliteGroupRepository, SqliteZoneRepository};
use music_infrastructure::store::{DurableWriter, StopReasonCache};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

struct Fixture {
    zones: SqliteZoneRepository,
    groups: SqliteGroupRepository,
    pool: sqlx::SqlitePool,
    shutdown: CancellationToken,
}

async fn fixture() -> Fixture {
    let pool = create_test_pool().await.unwrap();
    let cache: StopReasonCache = Arc::new(DashMap::new());
    let shutdown = CancellationToken::new();
    let durable = DurableWriter::spawn(pool.clone(), cache.clone(), shutdown.clone());

    Fixture {
        zones: SqliteZoneRepository::new(pool.clone(), pool.clone(), durable, cache),
        groups: SqliteGroupRepository::new(pool.clone(), pool.clone()),
        pool,
        shutdown,
    }
}

fn zone(name: &str) -> Zone {
    Zone::new(name.to_string(), ZoneType::Normal, FsmMode::Auto)
}

#[tokio::test]
async fn add_get_round_trip() {
    let fx = fixture().await;
    fx.zones.add_zone(&zone("example.com.")).await.unwrap();

    let loaded = fx.zones.get_zone("example.com.").await.unwrap().unwrap();
    assert_eq!(loaded.name, "example.com.");
    assert!(!loaded.is_in_process());
    assert!(loaded.stop_reason.is_none());

    let err = fx.zones.add_zone(&zone("example.com.")).await.unwrap_err();
    assert!(matches!(err, MusicError::Database(_)));
    fx.shutdown.cancel();
}

#[tokio::test]
async fn state_transition_is_compare_and_set() {
    let fx = fixture().await;
    fx.zones.add_zone(&zone("example.com.")).await.unwrap();
    fx.zones
        .attach_fsm("example.com.", "add-signer", "unsynced", false)
        .await
        .unwrap();

    fx.zones
        .state_transition("example.com.", "unsynced", "dnskeys-synced")
        .await
        .unwrap();

    // A second transition from the stale state loses.
    let err = fx
        .zones
        .state_transition("example.com.", "unsynced", "cds-published")
        .await
        .unwrap_err();
    let MusicError::StateMismatch { actual, .. } = err else {
        panic!("expected state mismatch");
    };
    assert_eq!(actual, "dnskeys-synced");

    let loaded = fx.zones.get_zone("example.com.").await.unwrap().unwrap();
    assert_eq!(loaded.state, "dnskeys-synced");
    fx.shutdown.cancel();
}

#[tokio::test]
async fn attach_detach_lifecycle() {
    let fx = fixture().await;
    fx.zones.add_zone(&zone("example.com.")).await.unwrap();

    fx.zones
        .attach_fsm("example.com.", "add-signer", "unsynced", false)
        .await
        .unwrap();

    let err = fx
        .zones
        .attach_fsm("example.com.", "verify-zone-sync", "verified", false)
        .await
        .unwrap_err();
    assert!(matches!(err, MusicError::AlreadyAttached { .. }));

    // Preempt replaces the process.
    fx.zones
        .attach_fsm("example.com.", "verify-zone-sync", "verified", true)
        .await
        .unwrap();

    let err = fx
        .zones
        .detach_fsm("example.com.", "add-signer")
        .await
        .unwrap_err();
    assert!(matches!(err, MusicError::NotAttached { .. }));

    fx.zones
        .detach_fsm("example.com.", "verify-zone-sync")
        .await
        .unwrap();
    let loaded = fx.zones.get_zone("example.com.").await.unwrap().unwrap();
    assert!(loaded.fsm.is_empty());
    assert!(loaded.state.is_empty());
    fx.shutdown.cancel();
}

#[tokio::test]
async fn stop_reason_read_your_writes() {
    let fx = fixture().await;
    fx.zones.add_zone(&zone("example.com.")).await.unwrap();

    fx.zones
        .set_stop_reason("example.com.", "signer timeout")
        .await
        .unwrap();

    // Visible immediately, before the writer has committed.
    assert_eq!(
        fx.zones.get_stop_reason("example.com.").await.unwrap(),
        Some("signer timeout".to_string())
    );

    // Eventually the durable copy also carries it and the status flips.
    for _ in 0..50 {
        let loaded = fx.zones.get_zone("example.com.").await.unwrap().unwrap();
        if loaded.is_blocked() && loaded.stop_reason.is_some() {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT value FROM zone_metadata WHERE zone_name = 'example.com.' AND key = 'stop-reason'",
    )
    .fetch_optional(&fx.pool)
    .await
    .unwrap();
    assert_eq!(row, Some(("signer timeout".to_string(),)));

    // A successful transition clears it.
    fx.zones
        .attach_fsm("example.com.", "add-signer", "unsynced", false)
        .await
        .unwrap();
    fx.zones
        .state_transition("example.com.", "unsynced", "dnskeys-synced")
        .await
        .unwrap();
    assert_eq!(fx.zones.get_stop_reason("example.com.").await.unwrap(), None);
    fx.shutdown.cancel();
}

#[tokio::test]
async fn locked_group_refuses_membership_changes() {
    let fx = fixture().await;
    fx.groups.add_group("g1").await.unwrap();
    fx.zones.add_zone(&zone("z1.example.")).await.unwrap();
    fx.zones.add_zone(&zone("z2.example.")).await.unwrap();
    fx.zones.zone_join_group("z1.example.", "g1").await.unwrap();

    fx.groups
        .lock_for_process("g1", "add-signer", Some("signer-b"), None)
        .await
        .unwrap();

    let err = fx
        .zones
        .zone_join_group("z2.example.", "g1")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "signer group g1 locked");

    let err = fx
        .zones
        .zone_leave_group("z1.example.", "g1")
        .await
        .unwrap_err();
    assert!(matches!(err, MusicError::GroupLocked(_)));

    // Double lock is refused too.
    let err = fx
        .groups
        .lock_for_process("g1", "remove-signer", None, Some("signer-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, MusicError::GroupLocked(_)));
    fx.shutdown.cancel();
}

#[tokio::test]
async fn process_completion_unlocks_and_applies_pending() {
    let fx = fixture().await;
    fx.groups.add_group("g1").await.unwrap();
    fx.zones.add_zone(&zone("z1.example.")).await.unwrap();
    fx.zones.zone_join_group("z1.example.", "g1").await.unwrap();
    fx.groups
        .lock_for_process("g1", "add-signer", None, None)
        .await
        .unwrap();
    fx.zones
        .attach_fsm("z1.example.", "add-signer", "unsynced", false)
        .await
        .unwrap();

    // Still running: the zone is in the process.
    assert!(!fx.groups.check_if_process_complete("g1").await.unwrap());

    fx.zones.detach_fsm("z1.example.", "add-signer").await.unwrap();
    assert!(fx.groups.check_if_process_complete("g1").await.unwrap());

    let group = fx.groups.get_group("g1").await.unwrap().unwrap();
    assert!(!group.locked);
    assert!(group.current_process.is_empty());
    fx.shutdown.cancel();
}

#[tokio::test]
async fn zone_dnskey_contributions_round_trip() {
    let fx = fixture().await;
    fx.zones.add_zone(&zone("example.com.")).await.unwrap();

    let key = DnskeyData {
        flags: 257,
        protocol: 3,
        algorithm: 13,
        public_key: "AAAA".into(),
    };
    fx.zones
        .set_zone_dnskeys("example.com.", "signer-a", std::slice::from_ref(&key))
        .await
        .unwrap();
    fx.zones
        .set_zone_nses(
            "example.com.",
            "signer-a",
            &["ns1.signer-a.example.".to_string()],
        )
        .await
        .unwrap();

    // The writes land via the durable writer; poll for them.
    let mut keys = Vec::new();
    for _ in 0..50 {
        keys = fx
            .zones
            .get_zone_dnskeys("example.com.", "signer-a")
            .await
            .unwrap();
        if !keys.is_empty() {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(keys, vec![key]);
    assert_eq!(
        fx.zones
            .get_zone_nses("example.com.", "signer-a")
            .await
            .unwrap(),
        vec!["ns1.signer-a.example.".to_string()]
    );
    fx.shutdown.cancel();
}
