//! Wannabe intake and promotion.

use music_application::ports::PeerDirectory;
use music_application::services::{BeatMsg, FullBeatMsg, HelloMsg, HelloService};
use music_domain::{HsyncData, HsyncMethod, RecordData, RecordType, Rrset};
use std::collections::BTreeSet;
use std::sync::Arc;

mod helpers;
use helpers::{MockDirectory, MockDnsLookup};

fn hello(identity: &str, zones: &[&str]) -> HelloMsg {
    HelloMsg {
        identity: identity.to_string(),
        methods: BTreeSet::from([HsyncMethod::Api]),
        zones: zones.iter().map(|z| z.to_string()).collect(),
    }
}

fn hsync_announcing(zone: &str, targets: &[&str]) -> Rrset {
    Rrset::with_records(
        zone.to_string(),
        RecordType::HSYNC,
        300,
        targets
            .iter()
            .map(|t| {
                RecordData::Hsync(HsyncData {
                    method: HsyncMethod::Api,
                    target: t.to_string(),
                })
            })
            .collect(),
    )
}

fn service() -> (Arc<MockDirectory>, Arc<MockDnsLookup>, HelloService) {
    let directory = Arc::new(MockDirectory::new());
    let lookup = Arc::new(MockDnsLookup::new());
    let service = HelloService::new(directory.clone(), lookup.clone(), "me.example.".into());
    (directory, lookup, service)
}

#[tokio::test]
async fn verified_wannabe_is_promoted() {
    let (directory, lookup, service) = service();
    lookup.set_answer(
        "z.example.",
        hsync_announcing("z.example.", &["me.example.", "peer.example."]),
    );

    service.receive_hello(hello("peer.example.", &["z.example."]));
    assert!(directory.get("peer.example.").is_none());

    let promoted = service.evaluate_wannabes().await.unwrap();
    assert_eq!(promoted, vec!["peer.example.".to_string()]);

    let peer = directory.get("peer.example.").unwrap();
    assert!(peer.shared_zones.contains("z.example."));
    assert!(peer.supports(HsyncMethod::Api));
}

#[tokio::test]
async fn unannounced_wannabe_is_dropped() {
    let (directory, lookup, service) = service();
    // The zone's HSYNC announces only us; the claimant is lying.
    lookup.set_answer("z.example.", hsync_announcing("z.example.", &["me.example."]));

    service.receive_hello(hello("liar.example.", &["z.example."]));
    let promoted = service.evaluate_wannabes().await.unwrap();

    assert!(promoted.is_empty());
    assert!(directory.get("liar.example.").is_none());
}

#[tokio::test]
async fn own_identity_is_ignored() {
    let (directory, _lookup, service) = service();
    service.receive_hello(hello("me.example.", &["z.example."]));
    assert!(service.evaluate_wannabes().await.unwrap().is_empty());
    assert!(directory.get("me.example.").is_none());
}

#[tokio::test]
async fn beats_require_prior_membership() {
    let (directory, lookup, service) = service();

    let beat = BeatMsg {
        identity: "peer.example.".into(),
        shared_zone_count: 1,
    };
    assert!(!service.receive_beat(&beat));

    lookup.set_answer(
        "z.example.",
        hsync_announcing("z.example.", &["me.example.", "peer.example."]),
    );
    service.receive_hello(hello("peer.example.", &["z.example."]));
    service.evaluate_wannabes().await.unwrap();

    assert!(service.receive_beat(&beat));

    let full = FullBeatMsg {
        identity: "peer.example.".into(),
        zones: BTreeSet::from(["z.example.".to_string(), "y.example.".to_string()]),
    };
    assert!(service.receive_full_beat(full));
    assert_eq!(directory.get("peer.example.").unwrap().shared_zones.len(), 2);
}
