//! Pure permission checks over the cached permission set.
//!
//! "Permissions not loaded" (`None`) is a distinct state from "permission
//! denied", but both evaluate to `false` here: gating decisions always fail
//! closed, and nothing in this module can panic or error.

use crate::users::model::UserPermissions;

/// True iff `name` is a member of the cached permission names
pub fn has_permission(permissions: Option<&UserPermissions>, name: &str) -> bool {
    permissions.is_some_and(|p| p.permission_names.iter().any(|n| n == name))
}

/// True iff at least one of `names` is granted
pub fn has_any_permission<S: AsRef<str>>(
    permissions: Option<&UserPermissions>,
    names: &[S],
) -> bool {
    names
        .iter()
        .any(|name| has_permission(permissions, name.as_ref()))
}

/// True iff every one of `names` is granted
pub fn has_all_permissions<S: AsRef<str>>(
    permissions: Option<&UserPermissions>,
    names: &[S],
) -> bool {
    names
        .iter()
        .all(|name| has_permission(permissions, name.as_ref()))
}

/// True iff a role with the given name is present
pub fn has_role(permissions: Option<&UserPermissions>, role_name: &str) -> bool {
    permissions.is_some_and(|p| p.roles.iter().any(|r| r.name == role_name))
}
