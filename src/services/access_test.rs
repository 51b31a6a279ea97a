use super::*;
use crate::state::test_helpers::{all_grants, dummy_profile};

fn grants_with(key: ModuleKey, enabled: bool, team: Option<&str>) -> Vec<ModuleGrant> {
    let mut grants = all_grants();
    for grant in &mut grants {
        if grant.key == key {
            grant.enabled = enabled;
            grant.team = team.map(str::to_owned);
        }
    }
    grants
}

// =============================================================================
// Role / ModuleKey parsing
// =============================================================================

#[test]
fn role_round_trips_through_str() {
    for role in [Role::Admin, Role::Manager, Role::Member] {
        assert_eq!(Role::from_str(role.as_str()), Some(role));
    }
    assert_eq!(Role::from_str(" Admin "), Some(Role::Admin));
    assert_eq!(Role::from_str("owner"), None);
}

#[test]
fn role_staff_flag() {
    assert!(Role::Admin.is_staff());
    assert!(Role::Manager.is_staff());
    assert!(!Role::Member.is_staff());
}

#[test]
fn module_key_round_trips_through_str() {
    for key in ModuleKey::ALL {
        assert_eq!(ModuleKey::from_str(key.as_str()), Some(key));
    }
    assert_eq!(ModuleKey::from_str("TASKS"), Some(ModuleKey::Tasks));
    assert_eq!(ModuleKey::from_str("billing"), None);
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
    assert_eq!(serde_json::to_string(&ModuleKey::Tickets).unwrap(), "\"tickets\"");
}

// =============================================================================
// can_access_module
// =============================================================================

#[test]
fn member_sees_entity_modules_only() {
    let member = dummy_profile(Role::Member);
    let modules = accessible_modules(&member, &all_grants());
    assert_eq!(
        modules,
        vec![ModuleKey::Dashboard, ModuleKey::Tasks, ModuleKey::Tickets, ModuleKey::Calls, ModuleKey::Messages]
    );
}

#[test]
fn manager_sees_users_but_not_settings() {
    let manager = dummy_profile(Role::Manager);
    let grants = all_grants();
    assert!(can_access_module(&manager, ModuleKey::Users, &grants));
    assert!(!can_access_module(&manager, ModuleKey::Settings, &grants));
}

#[test]
fn admin_sees_everything_enabled() {
    let admin = dummy_profile(Role::Admin);
    assert_eq!(accessible_modules(&admin, &all_grants()), ModuleKey::ALL.to_vec());
}

#[test]
fn disabled_module_is_hidden_even_from_admin() {
    let admin = dummy_profile(Role::Admin);
    let grants = grants_with(ModuleKey::Calls, false, None);
    assert!(!can_access_module(&admin, ModuleKey::Calls, &grants));
}

#[test]
fn missing_grant_denies() {
    let member = dummy_profile(Role::Member);
    let grants: Vec<ModuleGrant> = all_grants().into_iter().filter(|g| g.key != ModuleKey::Tickets).collect();
    assert!(!can_access_module(&member, ModuleKey::Tickets, &grants));
}

#[test]
fn inactive_profile_sees_nothing() {
    let mut admin = dummy_profile(Role::Admin);
    admin.active = false;
    assert!(accessible_modules(&admin, &all_grants()).is_empty());
}

#[test]
fn team_restriction_admits_matching_team_case_insensitively() {
    let mut member = dummy_profile(Role::Member);
    member.team = Some(" support ".into());
    let grants = grants_with(ModuleKey::Tickets, true, Some("Support"));
    assert!(can_access_module(&member, ModuleKey::Tickets, &grants));
}

#[test]
fn team_restriction_rejects_other_or_missing_team() {
    let grants = grants_with(ModuleKey::Calls, true, Some("sales"));

    let mut support = dummy_profile(Role::Member);
    support.team = Some("support".into());
    assert!(!can_access_module(&support, ModuleKey::Calls, &grants));

    let no_team = dummy_profile(Role::Manager);
    assert!(!can_access_module(&no_team, ModuleKey::Calls, &grants));
}

#[test]
fn admin_bypasses_team_restriction() {
    let admin = dummy_profile(Role::Admin);
    let grants = grants_with(ModuleKey::Calls, true, Some("sales"));
    assert!(can_access_module(&admin, ModuleKey::Calls, &grants));
}

#[test]
fn blank_team_restriction_is_ignored() {
    let member = dummy_profile(Role::Member);
    let grants = grants_with(ModuleKey::Tasks, true, Some("   "));
    assert!(can_access_module(&member, ModuleKey::Tasks, &grants));
}

// =============================================================================
// User administration
// =============================================================================

#[test]
fn only_admins_manage_users() {
    assert!(can_manage_users(Role::Admin));
    assert!(!can_manage_users(Role::Manager));
    assert!(!can_manage_users(Role::Member));
}

#[test]
fn staff_view_users() {
    assert!(can_view_users(Role::Admin));
    assert!(can_view_users(Role::Manager));
    assert!(!can_view_users(Role::Member));
}

// =============================================================================
// Record ownership
// =============================================================================

#[test]
fn member_modifies_own_assigned_or_reported_records() {
    let member = dummy_profile(Role::Member);
    let other = Uuid::new_v4();
    assert!(can_modify_record(&member, Some(member.id), Some(other)));
    assert!(can_modify_record(&member, None, Some(member.id)));
    assert!(!can_modify_record(&member, Some(other), Some(other)));
    assert!(!can_modify_record(&member, None, None));
}

#[test]
fn staff_modify_any_record() {
    let other = Uuid::new_v4();
    assert!(can_modify_record(&dummy_profile(Role::Manager), Some(other), None));
    assert!(can_modify_record(&dummy_profile(Role::Admin), None, None));
}

#[test]
fn member_deletes_only_reported_records() {
    let member = dummy_profile(Role::Member);
    assert!(can_delete_record(&member, Some(member.id)));
    assert!(!can_delete_record(&member, Some(Uuid::new_v4())));
    assert!(!can_delete_record(&member, None));
    assert!(can_delete_record(&dummy_profile(Role::Manager), None));
}
