use super::*;
use crate::state::test_helpers::{dummy_profile, test_app_state};

#[test]
fn validate_timezone_accepts_iana_names() {
    for tz in ["UTC", "Europe/Berlin", "America/Argentina/Buenos_Aires", "Etc/GMT+5", " Asia/Tokyo "] {
        assert!(validate_timezone(tz).is_ok(), "expected {tz:?} to be accepted");
    }
    assert_eq!(validate_timezone(" Asia/Tokyo ").unwrap(), "Asia/Tokyo");
}

#[test]
fn validate_timezone_rejects_malformed_names() {
    for tz in ["", "  ", "/UTC", "Europe/", "Europe//Berlin", "Europe/Berlin; DROP", "Zürich"] {
        assert!(validate_timezone(tz).is_err(), "expected {tz:?} to be rejected");
    }
}

#[tokio::test]
async fn update_organization_requires_admin() {
    let state = test_app_state();
    let manager = dummy_profile(Role::Manager);
    let err = update_organization(&state.pool, &manager, OrganizationPatch::default()).await.unwrap_err();
    assert!(matches!(err, RecordError::Forbidden(_)));
}

#[tokio::test]
async fn update_organization_validates_before_db() {
    let state = test_app_state();
    let admin = dummy_profile(Role::Admin);
    let patch = OrganizationPatch { name: Some("  ".into()), timezone: None };
    let err = update_organization(&state.pool, &admin, patch).await.unwrap_err();
    assert_eq!(err.to_string(), "name is required");
}
