//! Route and component gating decisions.
//!
//! Guards are pure functions over a [`SessionSnapshot`]; they decide, the
//! UI renders. The authentication gate can ask for navigation, the
//! permission gate never does — it only chooses between rendering its
//! children, a supplied fallback, or nothing.

use crate::session::manager::SessionSnapshot;
use crate::session::permissions;

/// Route prefixes that require an authenticated session
pub const PROTECTED_ROUTES: &[&str] = &["/dashboard", "/users", "/profile", "/settings"];

/// Route prefixes reserved for unauthenticated visitors
pub const PUBLIC_ROUTES: &[&str] = &["/login", "/register", "/forgot-password"];

/// Decision of the authentication gate for a single protected surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// Session restoration is still running; hold rendering
    Pending,
    /// No session; send the user to the login surface
    RedirectToLogin,
    /// Authenticated; render the children
    Render,
}

/// Gate a surface that requires authentication
pub fn authenticated(snapshot: &SessionSnapshot) -> AuthDecision {
    if snapshot.is_loading {
        AuthDecision::Pending
    } else if !snapshot.is_authenticated() {
        AuthDecision::RedirectToLogin
    } else {
        AuthDecision::Render
    }
}

/// Decision for a navigation target, taking the route tables into account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Pending,
    RedirectToLogin,
    /// Authenticated users have no business on the auth pages
    RedirectToDashboard,
    Render,
}

/// Classify a navigation against the protected and public route tables
pub fn route_decision(snapshot: &SessionSnapshot, path: &str) -> RouteDecision {
    if snapshot.is_loading {
        return RouteDecision::Pending;
    }

    let is_protected = PROTECTED_ROUTES.iter().any(|r| path.starts_with(r));
    let is_public = PUBLIC_ROUTES.iter().any(|r| path.starts_with(r));

    if is_protected && !snapshot.is_authenticated() {
        RouteDecision::RedirectToLogin
    } else if is_public && snapshot.is_authenticated() {
        RouteDecision::RedirectToDashboard
    } else {
        RouteDecision::Render
    }
}

/// What a permission-gated component is required to hold.
///
/// A single permission takes precedence over the permission list, and a
/// single role over the role list, mirroring how gated components declare
/// their requirements. `require_all` switches the list checks from "any"
/// to "all" for permissions and roles alike.
#[derive(Debug, Clone, Default)]
pub struct AccessRequirement {
    pub permission: Option<String>,
    pub permissions: Vec<String>,
    pub role: Option<String>,
    pub roles: Vec<String>,
    pub require_all: bool,
}

impl AccessRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permission(mut self, name: impl Into<String>) -> Self {
        self.permission = Some(name.into());
        self
    }

    pub fn with_permissions<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.permissions = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_role(mut self, name: impl Into<String>) -> Self {
        self.role = Some(name.into());
        self
    }

    pub fn with_roles<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.roles = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    /// Evaluate this requirement against a (possibly absent) permission set
    pub fn is_satisfied(&self, snapshot: &SessionSnapshot) -> bool {
        let granted = snapshot.permissions();

        let permissions_ok = if let Some(permission) = &self.permission {
            permissions::has_permission(granted, permission)
        } else if !self.permissions.is_empty() {
            if self.require_all {
                permissions::has_all_permissions(granted, &self.permissions)
            } else {
                permissions::has_any_permission(granted, &self.permissions)
            }
        } else {
            true
        };

        let roles_ok = if let Some(role) = &self.role {
            permissions::has_role(granted, role)
        } else if !self.roles.is_empty() {
            if self.require_all {
                self.roles.iter().all(|r| permissions::has_role(granted, r))
            } else {
                self.roles.iter().any(|r| permissions::has_role(granted, r))
            }
        } else {
            true
        };

        permissions_ok && roles_ok
    }
}

/// Outcome of the permission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Requirement satisfied; render the children
    Render,
    /// Requirement not satisfied; render the supplied fallback
    Fallback,
    /// Requirement not satisfied and no fallback was requested
    Hidden,
}

/// Gate a component behind an access requirement.
///
/// Never navigates. While the session is still loading the gate denies,
/// because an absent permission set must read as "denied", not "allowed".
pub fn permission_gate(
    snapshot: &SessionSnapshot,
    requirement: &AccessRequirement,
    show_fallback: bool,
) -> GateOutcome {
    if !snapshot.is_loading && requirement.is_satisfied(snapshot) {
        GateOutcome::Render
    } else if show_fallback {
        GateOutcome::Fallback
    } else {
        GateOutcome::Hidden
    }
}
