use super::*;
use crate::state::test_helpers::{dummy_profile, test_app_state};

fn update(enabled: bool, team: Option<&str>) -> GrantUpdate {
    GrantUpdate { enabled, team: team.map(str::to_owned) }
}

#[test]
fn validate_grant_update_requires_admin() {
    let manager = dummy_profile(Role::Manager);
    let err = validate_grant_update(&manager, ModuleKey::Calls, &update(false, None)).unwrap_err();
    assert!(matches!(err, RecordError::Forbidden(_)));
}

#[test]
fn validate_grant_update_protects_settings_module() {
    let admin = dummy_profile(Role::Admin);
    assert!(validate_grant_update(&admin, ModuleKey::Settings, &update(false, None)).is_err());
    assert!(validate_grant_update(&admin, ModuleKey::Settings, &update(true, Some("ops"))).is_err());
    assert!(validate_grant_update(&admin, ModuleKey::Settings, &update(true, None)).is_ok());
}

#[test]
fn validate_grant_update_normalizes_team() {
    let admin = dummy_profile(Role::Admin);
    assert_eq!(validate_grant_update(&admin, ModuleKey::Calls, &update(true, Some(" Sales "))).unwrap().as_deref(), Some("Sales"));
    assert_eq!(validate_grant_update(&admin, ModuleKey::Calls, &update(true, Some(""))).unwrap(), None);
}

#[test]
fn module_setting_converts_to_grant() {
    let setting = ModuleSetting {
        key: ModuleKey::Tickets,
        name: "Tickets".into(),
        description: String::new(),
        enabled: true,
        team: Some("support".into()),
    };
    let grant = ModuleGrant::from(&setting);
    assert_eq!(grant, ModuleGrant { key: ModuleKey::Tickets, enabled: true, team: Some("support".into()) });
}

#[tokio::test]
async fn set_module_grant_rejects_member_before_db() {
    let state = test_app_state();
    let member = dummy_profile(Role::Member);
    let err = set_module_grant(&state.pool, &member, ModuleKey::Tasks, update(true, None)).await.unwrap_err();
    assert!(matches!(err, RecordError::Forbidden(_)));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn grants_round_trip_against_live_db() {
    let pool = crate::state::test_helpers::live_pool().await;
    let (organization_id, admin) = crate::state::test_helpers::seed_live_org(&pool, Role::Admin).await;

    let setting = set_module_grant(&pool, &admin, ModuleKey::Calls, update(true, Some("sales"))).await.unwrap();
    assert_eq!(setting.team.as_deref(), Some("sales"));

    let grants = load_grants(&pool, organization_id).await.unwrap();
    assert_eq!(grants.len(), ModuleKey::ALL.len());
    assert!(grants.iter().all(|g| g.enabled));
}
