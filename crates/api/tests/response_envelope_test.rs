//! The wire contract of the response envelope: PascalCase keys, the
//! error shape, and payload omission when empty.

use music_api::dto::ApiResponse;
use music_domain::MusicError;

#[test]
fn success_envelope_keys_are_pascal_case() {
    let response = ApiResponse::ok("3 zones").with_zones(vec![]);
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["Msg"], "3 zones");
    assert_eq!(json["Error"], false);
    assert!(json.get("ErrorMsg").is_none());
    assert!(json["Zones"].is_array());
    // Unused payload slots do not appear at all.
    assert!(json.get("Signers").is_none());
    assert!(json.get("Graph").is_none());
}

#[test]
fn failure_envelope_carries_error_msg() {
    let response = ApiResponse::failure(&MusicError::GroupLocked("g1".into()));
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["Error"], true);
    assert_eq!(json["ErrorMsg"], "signer group g1 locked");
}

#[test]
fn unknown_command_names_the_endpoint() {
    let response = ApiResponse::unknown_command("zone", "frobnicate");
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["Error"], true);
    assert_eq!(json["ErrorMsg"], "unknown zone command 'frobnicate'");
}
