//! # Authorization Gate
//!
//! Maps `(role, state)` to the set of lifecycle actions a caller may invoke.
//! Only `admin` carries a non-empty action allowlist; `warehouse_staff` and
//! `supplier` see an empty set from every state.
//!
//! Creating a draft (and submitting it as part of creation) is a separate
//! creation-time privilege, see [`Role::can_create_drafts`]. It is not
//! consulted by [`permitted_actions`].

use std::collections::BTreeSet;

use ims_core::ActorId;
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::lifecycle::{edges_from, LifecycleAction, LifecycleState};

/// A caller role derived from identity-provider groups.
///
/// Declaration order is privilege order, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full lifecycle control.
    Admin,
    /// Creates and submits drafts.
    WarehouseStaff,
    /// Read-only with respect to the lifecycle.
    Supplier,
}

impl Role {
    /// All roles, highest privilege first.
    pub const ALL: [Role; 3] = [Self::Admin, Self::WarehouseStaff, Self::Supplier];

    /// The canonical role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::WarehouseStaff => "warehouse_staff",
            Self::Supplier => "supplier",
        }
    }

    /// Actions this role may invoke from any state that has a matching edge.
    pub fn action_allowlist(&self) -> &'static [LifecycleAction] {
        match self {
            Self::Admin => &LifecycleAction::ALL,
            Self::WarehouseStaff | Self::Supplier => &[],
        }
    }

    /// Whether this role may create drafts and submit them at creation.
    pub fn can_create_drafts(&self) -> bool {
        match self {
            Self::Admin | Self::WarehouseStaff => true,
            Self::Supplier => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions `role` may invoke from `state`.
///
/// The intersection of the outgoing edges of `state` with the role's
/// allowlist, in edge-table order. Never fails; an unauthorized role gets an
/// empty vector.
pub fn permitted_actions(role: Role, state: LifecycleState) -> Vec<LifecycleAction> {
    let allow = role.action_allowlist();
    edges_from(state)
        .iter()
        .map(|e| e.action)
        .filter(|a| allow.contains(a))
        .collect()
}

/// The explicit set of roles held by one principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// An empty role set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `role` is held.
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Add a role.
    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    /// Whether no role is held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate held roles, highest privilege first.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// The highest-privilege role held, if any.
    pub fn primary(&self) -> Option<Role> {
        self.0.first().copied()
    }

    /// Union of [`permitted_actions`] over every held role.
    pub fn permitted_actions(&self, state: LifecycleState) -> Vec<LifecycleAction> {
        edges_from(state)
            .iter()
            .map(|e| e.action)
            .filter(|a| self.iter().any(|r| r.action_allowlist().contains(a)))
            .collect()
    }

    /// Whether any held role may invoke `action` from some state.
    pub fn allows_globally(&self, action: LifecycleAction) -> bool {
        self.iter().any(|r| r.action_allowlist().contains(&action))
    }

    /// Whether any held role carries the creation-time privilege.
    pub fn can_create_drafts(&self) -> bool {
        self.iter().any(|r| r.can_create_drafts())
    }

    /// Comma-separated role names, for error messages and logs.
    pub fn names(&self) -> String {
        self.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Hard authorization check for one action from one state.
///
/// # Errors
///
/// [`LifecycleError::Unauthorized`] when no held role permits `action`
/// from `state`.
pub fn authorize(
    roles: &RoleSet,
    state: LifecycleState,
    action: LifecycleAction,
) -> Result<(), LifecycleError> {
    if roles.permitted_actions(state).contains(&action) {
        Ok(())
    } else {
        Err(LifecycleError::Unauthorized {
            action: action.as_str().to_string(),
            state,
            roles: roles.names(),
        })
    }
}

/// Map identity-provider group names to roles.
///
/// Matching is a case-insensitive substring test: `admin` grants admin,
/// `warehouse` or `staff` grants warehouse staff, `supplier` grants
/// supplier. A caller whose groups match nothing is treated as warehouse
/// staff, the provider's default population.
pub fn roles_from_groups<I, S>(groups: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lowered: Vec<String> = groups
        .into_iter()
        .map(|g| g.as_ref().to_lowercase())
        .collect();
    let any = |needles: &[&str]| {
        lowered
            .iter()
            .any(|g| needles.iter().any(|n| g.contains(n)))
    };

    let mut roles = RoleSet::new();
    if any(&["admin"]) {
        roles.insert(Role::Admin);
    }
    if any(&["warehouse", "staff"]) {
        roles.insert(Role::WarehouseStaff);
    }
    if any(&["supplier"]) {
        roles.insert(Role::Supplier);
    }
    if roles.is_empty() {
        roles.insert(Role::WarehouseStaff);
    }
    roles
}

/// An authenticated caller: who they are and what they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Stable identifier issued by the identity provider.
    pub actor: ActorId,
    /// Roles derived from the caller's groups.
    pub roles: RoleSet,
}

impl Principal {
    /// Build a principal.
    pub fn new(actor: ActorId, roles: RoleSet) -> Self {
        Self { actor, roles }
    }
}
