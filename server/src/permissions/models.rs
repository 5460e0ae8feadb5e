//! Database models for the permission system.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Name of the distinguished role whose grants follow the permission catalog.
pub const ADMIN_ROLE_NAME: &str = "Admin";

/// A named capability that can be granted to a role.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Machine key. Unique across the catalog and the only field used for grant checks.
    pub name: String,
    pub display_name: String,
}

impl Permission {
    pub fn new(id: Uuid, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// A named group of grants.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

/// Grant of one permission to one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRow, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

/// Application user. Role assignment happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
}

/// User role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRow, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

/// Authenticated identity supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Permission row as returned by catalog listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionListItem {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
}

impl From<Permission> for PermissionListItem {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            display_name: permission.display_name,
        }
    }
}
