//! Role and module access gating.
//!
//! DESIGN
//! ======
//! Authorization is a small set of string-equality checks: a profile's
//! `role` and `team` against the organization's module grants. Everything in
//! this module is pure; routes call it before touching entity tables.
//!
//! RULES
//! =====
//! - Inactive profiles see nothing.
//! - A module needs an enabled grant for the organization.
//! - `users` is limited to admins and managers, `settings` to admins.
//! - A grant with a team restriction admits non-admins of that team only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::profile::Profile;

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Member,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Admins and managers may act on any record in their organization.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

// =============================================================================
// MODULE KEYS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKey {
    Dashboard,
    Tasks,
    Tickets,
    Calls,
    Messages,
    Users,
    Settings,
}

impl ModuleKey {
    /// Every module in display order.
    pub const ALL: [ModuleKey; 7] = [
        Self::Dashboard,
        Self::Tasks,
        Self::Tickets,
        Self::Calls,
        Self::Messages,
        Self::Users,
        Self::Settings,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Tasks => "tasks",
            Self::Tickets => "tickets",
            Self::Calls => "calls",
            Self::Messages => "messages",
            Self::Users => "users",
            Self::Settings => "settings",
        }
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|key| key.as_str() == normalized)
    }

    /// Minimum role needed regardless of grants.
    fn allows_role(self, role: Role) -> bool {
        match self {
            Self::Settings => role == Role::Admin,
            Self::Users => role.is_staff(),
            _ => true,
        }
    }
}

/// One organization's enablement state for a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleGrant {
    pub key: ModuleKey,
    pub enabled: bool,
    pub team: Option<String>,
}

// =============================================================================
// MODULE GATING
// =============================================================================

fn teams_match(required: &str, actual: Option<&str>) -> bool {
    actual.is_some_and(|team| team.trim().eq_ignore_ascii_case(required.trim()))
}

/// Whether `profile` may open `key` given the organization's grants.
#[must_use]
pub fn can_access_module(profile: &Profile, key: ModuleKey, grants: &[ModuleGrant]) -> bool {
    if !profile.active || !key.allows_role(profile.role) {
        return false;
    }

    let Some(grant) = grants.iter().find(|grant| grant.key == key) else {
        return false;
    };
    if !grant.enabled {
        return false;
    }

    match grant.team.as_deref().map(str::trim).filter(|team| !team.is_empty()) {
        None => true,
        Some(_) if profile.role == Role::Admin => true,
        Some(required) => teams_match(required, profile.team.as_deref()),
    }
}

/// Modules visible to `profile`, in display order.
#[must_use]
pub fn accessible_modules(profile: &Profile, grants: &[ModuleGrant]) -> Vec<ModuleKey> {
    ModuleKey::ALL
        .into_iter()
        .filter(|key| can_access_module(profile, *key, grants))
        .collect()
}

// =============================================================================
// USER ADMINISTRATION
// =============================================================================

#[must_use]
pub fn can_manage_users(role: Role) -> bool {
    role == Role::Admin
}

#[must_use]
pub fn can_view_users(role: Role) -> bool {
    role.is_staff()
}

// =============================================================================
// RECORD OWNERSHIP
// =============================================================================

/// Staff edit anything; members edit records assigned to or reported by them.
#[must_use]
pub fn can_modify_record(profile: &Profile, assignee_id: Option<Uuid>, reporter_id: Option<Uuid>) -> bool {
    profile.role.is_staff() || assignee_id == Some(profile.id) || reporter_id == Some(profile.id)
}

/// Staff delete anything; members delete only what they reported.
#[must_use]
pub fn can_delete_record(profile: &Profile, reporter_id: Option<Uuid>) -> bool {
    profile.role.is_staff() || reporter_id == Some(profile.id)
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
