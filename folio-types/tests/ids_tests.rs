use folio_types::DeviceId;
use std::collections::HashSet;
use std::str::FromStr;

#[test]
fn device_id_new_is_unique() {
    let a = DeviceId::new();
    let b = DeviceId::new();
    assert_ne!(a, b);
}

#[test]
fn device_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = DeviceId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn device_id_display_and_parse() {
    let id = DeviceId::new();
    let parsed = id.to_string().parse::<DeviceId>().unwrap();
    assert_eq!(id, parsed);
    let via_from_str = DeviceId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, via_from_str);
}

#[test]
fn device_id_parse_invalid() {
    assert!("not-a-uuid".parse::<DeviceId>().is_err());
    assert!(DeviceId::from_str("garbage").is_err());
}

#[test]
fn device_id_hash_and_eq() {
    let id = DeviceId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn device_id_serializes_as_plain_string() {
    let id = DeviceId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let back: DeviceId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
