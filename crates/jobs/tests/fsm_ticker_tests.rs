use music_domain::config::FsmIntervals;
use music_domain::{FsmMode, Zone, ZoneType};
use music_jobs::FsmTickerJob;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{advance, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::{stub_engine, StubZoneRepository};

fn zone(name: &str, mode: FsmMode, process: &str) -> Zone {
    let mut zone = Zone::new(name.to_string(), ZoneType::Normal, mode);
    zone.fsm = process.to_string();
    if !process.is_empty() {
        zone.state = "unsynced".to_string();
    }
    zone
}

fn intervals() -> FsmIntervals {
    FsmIntervals {
        target: 60,
        minimum: 30,
        maximum: 600,
        complete: 3600,
    }
}

#[tokio::test(start_paused = true)]
async fn target_tick_pushes_in_process_auto_zones() {
    let zones = Arc::new(StubZoneRepository {
        zones: vec![
            zone("active.example.", FsmMode::Auto, "add-signer"),
            zone("idle.example.", FsmMode::Auto, ""),
            zone("manual.example.", FsmMode::Manual, "add-signer"),
        ],
    });
    let engine = stub_engine(zones.clone(), intervals());
    let (tx, mut rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    Arc::new(
        FsmTickerJob::new(zones, engine, tx, intervals()).with_cancellation(shutdown.clone()),
    )
    .start()
    .await;

    advance(Duration::from_secs(61)).await;

    let check = rx.recv().await.unwrap();
    assert_eq!(check.zone, "active.example.");
    assert!(check.next_state.is_none());

    // Neither the idle zone nor the manual zone got a stimulus.
    assert!(rx.try_recv().is_err());

    shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn complete_sweep_touches_every_in_process_zone() {
    let zones = Arc::new(StubZoneRepository {
        zones: vec![
            zone("one.example.", FsmMode::Auto, "add-signer"),
            zone("two.example.", FsmMode::Auto, "remove-signer"),
        ],
    });
    // The target ticker is pushed past the sweep so only the complete
    // sweep can produce stimuli.
    let intervals = FsmIntervals {
        target: 100_000,
        minimum: 30,
        maximum: 600,
        complete: 3600,
    };
    let engine = stub_engine(zones.clone(), intervals.clone());
    let (tx, mut rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();

    Arc::new(
        FsmTickerJob::new(zones, engine, tx, intervals).with_cancellation(shutdown.clone()),
    )
    .start()
    .await;

    advance(Duration::from_secs(3601)).await;

    let mut seen = std::collections::BTreeSet::new();
    while let Ok(check) = rx.try_recv() {
        seen.insert(check.zone);
    }
    assert!(seen.contains("one.example."));
    assert!(seen.contains("two.example."));
    assert_eq!(seen.len(), 2);

    shutdown.cancel();
}
