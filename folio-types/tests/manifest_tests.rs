use folio_types::{DeviceId, Error, MANIFEST_VERSION, SyncLogType, SyncManifest, SyncStatus};
use std::str::FromStr;

#[test]
fn new_manifest_has_single_identity_triple() {
    let device = DeviceId::new();
    let manifest = SyncManifest::new(device, 42);
    assert_eq!(manifest.version, MANIFEST_VERSION);
    assert_eq!(manifest.last_updated, 42);
    assert_eq!(manifest.device_id, device.to_string());
    assert!(manifest.books.is_empty());
    assert!(manifest.device_registry.is_empty());
}

#[test]
fn touch_updates_writer_and_registry() {
    let first = DeviceId::new();
    let second = DeviceId::new();
    let mut manifest = SyncManifest::new(first, 1);
    manifest.touch(first, "Phone", 5);
    manifest.touch(second, "Tablet", 9);

    assert_eq!(manifest.last_updated, 9);
    assert_eq!(manifest.device_id, second.to_string());
    assert_eq!(manifest.device_registry.len(), 2);
    assert_eq!(manifest.device_registry[&first.to_string()].last_seen, 5);
    assert_eq!(manifest.device_registry[&second.to_string()].name, "Tablet");
}

#[test]
fn wire_format_uses_camel_case_keys() {
    let manifest = SyncManifest::new(DeviceId::new(), 7);
    let json = serde_json::to_value(&manifest).unwrap();
    for key in [
        "version",
        "lastUpdated",
        "deviceId",
        "books",
        "lexicon",
        "readingList",
        "transientState",
        "deviceRegistry",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert!(json["transientState"].get("ttsPositions").is_some());
}

#[test]
fn minimal_document_fills_empty_collections() {
    let raw = br#"{"version":1,"lastUpdated":3,"deviceId":"dev"}"#;
    let manifest = SyncManifest::from_slice(raw).unwrap();
    assert_eq!(manifest.device_id, "dev");
    assert!(manifest.lexicon.is_empty());
    assert!(manifest.tts_positions().is_empty());
}

#[test]
fn newer_schema_version_is_rejected() {
    let raw = br#"{"version":99,"lastUpdated":3,"deviceId":"dev"}"#;
    match SyncManifest::from_slice(raw) {
        Err(Error::UnsupportedVersion { found, supported }) => {
            assert_eq!(found, 99);
            assert_eq!(supported, MANIFEST_VERSION);
        }
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn manifest_bytes_roundtrip() {
    let manifest = SyncManifest::new(DeviceId::new(), 11);
    let bytes = manifest.to_vec().unwrap();
    assert_eq!(SyncManifest::from_slice(&bytes).unwrap(), manifest);
}

#[test]
fn log_enums_parse_their_wire_names() {
    for kind in [SyncLogType::Push, SyncLogType::Pull, SyncLogType::Merge, SyncLogType::Error] {
        assert_eq!(SyncLogType::from_str(kind.as_str()).unwrap(), kind);
    }
    for status in [SyncStatus::Success, SyncStatus::Failure, SyncStatus::Conflict] {
        assert_eq!(SyncStatus::from_str(status.as_str()).unwrap(), status);
    }
    assert!(SyncStatus::from_str("maybe").is_err());
}
