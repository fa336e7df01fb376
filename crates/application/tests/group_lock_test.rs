//! Group locking: a group running a process rejects membership changes.

use music_application::ports::{
    GroupRepository, SignerRepository, ZoneRepository,
};
use music_application::use_cases::{SignerJoinGroupUseCase, ZoneJoinGroupUseCase};
use music_domain::{FsmMode, MusicError, Signer, SignerAuth, UpdateMethod, Zone, ZoneType};
use std::sync::Arc;
use tokio::sync::mpsc;

mod helpers;
use helpers::MockStore;

fn signer(name: &str) -> Signer {
    Signer {
        name: name.to_string(),
        method: UpdateMethod::Ddns,
        address: "192.0.2.10".into(),
        port: 53,
        auth: SignerAuth::None,
        fetch_limit: 5,
        update_limit: 5,
    }
}

async fn locked_group_fixture() -> Arc<MockStore> {
    let store = Arc::new(MockStore::new());
    store.add_signer(&signer("signer-a")).await.unwrap();
    store.add_signer(&signer("signer-b")).await.unwrap();
    store.add_group("g1").await.unwrap();
    store.add_signer_to_group("g1", "signer-a").await.unwrap();

    let z1 = Zone::new("z1.example.".into(), ZoneType::Normal, FsmMode::Auto);
    store.add_zone(&z1).await.unwrap();
    store.zone_join_group("z1.example.", "g1").await.unwrap();

    // Kick off add-signer: locks the group and attaches z1.
    let (tx, mut rx) = mpsc::channel(4);
    let join = SignerJoinGroupUseCase::new(store.clone(), store.clone(), store.clone(), tx);
    join.execute("signer-b", "g1").await.unwrap();
    let _ = rx.recv().await;

    store
}

#[tokio::test]
async fn locked_group_rejects_zone_join() {
    let store = locked_group_fixture().await;

    let z2 = Zone::new("z2.example.".into(), ZoneType::Normal, FsmMode::Auto);
    store.add_zone(&z2).await.unwrap();

    let join_zone = ZoneJoinGroupUseCase::new(store.clone(), store.clone());
    let err = join_zone.execute("z2.example.", "g1").await.unwrap_err();
    assert!(matches!(err, MusicError::GroupLocked(_)));
    assert_eq!(err.to_string(), "signer group g1 locked");

    // The rejected zone is not bound to the group.
    assert!(store
        .zone_snapshot("z2.example.")
        .unwrap()
        .signer_group
        .is_none());
}

#[tokio::test]
async fn locked_group_rejects_zone_leave() {
    let store = locked_group_fixture().await;

    let err = store
        .zone_leave_group("z1.example.", "g1")
        .await
        .unwrap_err();
    assert!(matches!(err, MusicError::GroupLocked(_)));
}

#[tokio::test]
async fn locked_group_rejects_second_process() {
    let store = locked_group_fixture().await;

    let (tx, _rx) = mpsc::channel(4);
    let join = SignerJoinGroupUseCase::new(store.clone(), store.clone(), store.clone(), tx);
    store.add_signer(&signer("signer-c")).await.unwrap();

    let err = join.execute("signer-c", "g1").await.unwrap_err();
    assert!(matches!(err, MusicError::GroupLocked(_)));
}
