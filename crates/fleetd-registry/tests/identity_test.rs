//! Device identity tests: trust-on-first-use claims and heartbeats.

use std::sync::Arc;

use fleetd_registry::{AuthOutcome, FleetStore, IdentityService, NewRegistration, RegistryError};
use fleetd_storage::DeviceStatus;

fn setup() -> (tempfile::TempDir, Arc<FleetStore>, IdentityService) {
    let dir = tempfile::tempdir().unwrap();
    let store = FleetStore::open(dir.path().join("fleet.redb")).unwrap();
    let service = IdentityService::new(store.clone(), 8);
    (dir, store, service)
}

fn registration(device_id: &str, secret: &str) -> NewRegistration {
    NewRegistration {
        device_id: device_id.to_string(),
        secret: secret.to_string(),
        name: format!("{} name", device_id),
        platform: Some("linux".to_string()),
        app_version: Some("1.2.3".to_string()),
        ip: None,
    }
}

#[test]
fn first_contact_claims_identity_and_persists_hash() {
    let (_dir, store, service) = setup();

    // 16-character secret on a brand-new device id.
    let outcome = service.authenticate("dev-1", "sixteen-chars-ok").unwrap();
    assert_eq!(outcome, AuthOutcome::Bootstrapped);

    let record = store.load_device("dev-1").unwrap().unwrap();
    assert!(record.secret_hash.is_some());

    // Same secret again: verified, not re-claimed.
    let outcome = service.authenticate("dev-1", "sixteen-chars-ok").unwrap();
    assert_eq!(outcome, AuthOutcome::Verified);

    // A different secret is rejected now that a hash is bound.
    assert!(matches!(
        service.authenticate("dev-1", "another-secret-x"),
        Err(RegistryError::Unauthorized)
    ));
}

#[test]
fn register_creates_and_updates_metadata() {
    let (_dir, store, service) = setup();

    let (record, outcome) = service
        .register(registration("dev-1", "first-secret-abc"))
        .unwrap();
    assert_eq!(outcome, AuthOutcome::Bootstrapped);
    assert_eq!(record.name, "dev-1 name");
    assert_eq!(record.platform.as_deref(), Some("linux"));

    // Re-register with the same secret updates fields in place.
    let mut reg = registration("dev-1", "first-secret-abc");
    reg.name = "renamed".to_string();
    let (record, outcome) = service.register(reg).unwrap();
    assert_eq!(outcome, AuthOutcome::Verified);
    assert_eq!(record.name, "renamed");
    assert_eq!(store.device_count().unwrap(), 1);

    // Registration leaves an audit trail.
    let events = store.list_events("dev-1", None).unwrap();
    assert!(events.iter().any(|e| e.kind == "registered"));
}

#[test]
fn register_with_wrong_secret_fails() {
    let (_dir, _store, service) = setup();

    service
        .register(registration("dev-1", "first-secret-abc"))
        .unwrap();
    assert!(matches!(
        service.register(registration("dev-1", "wrong-secret-abc")),
        Err(RegistryError::Unauthorized)
    ));
}

#[test]
fn heartbeat_requires_existing_bound_identity() {
    let (_dir, store, service) = setup();

    // Unknown device: heartbeat never claims.
    assert!(matches!(
        service.heartbeat("ghost", "long-enough-secret", None),
        Err(RegistryError::Unauthorized)
    ));
    assert!(!store.device_exists("ghost").unwrap());

    service
        .register(registration("dev-1", "first-secret-abc"))
        .unwrap();
    assert!(matches!(
        service.heartbeat("dev-1", "wrong-secret-abc", None),
        Err(RegistryError::Unauthorized)
    ));

    let record = service
        .heartbeat("dev-1", "first-secret-abc", Some("10.0.0.5"))
        .unwrap();
    assert_eq!(record.ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(record.status, DeviceStatus::Active);
}

#[test]
fn heartbeat_reactivates_disabled_device() {
    let (_dir, store, service) = setup();

    service
        .register(registration("dev-1", "first-secret-abc"))
        .unwrap();

    let mut record = store.load_device("dev-1").unwrap().unwrap();
    record.status = DeviceStatus::Disabled;
    store.save_device(&record).unwrap();

    // Status is informational: the heartbeat succeeds and flips the
    // device back to active.
    let record = service
        .heartbeat("dev-1", "first-secret-abc", None)
        .unwrap();
    assert_eq!(record.status, DeviceStatus::Active);
}
