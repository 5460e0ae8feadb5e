//! Persistence boundary for the permission system.
//!
//! Reads go straight to the backing store. Writes are staged in a
//! [`ChangeSet`] and applied all-or-nothing by [`PermissionStore::commit`].

use async_trait::async_trait;
use uuid::Uuid;

use super::listing::PermissionQuery;
use super::models::{Permission, Role, RolePermission, User};

/// Errors raised by a permission store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A uniqueness or referential constraint rejected the commit.
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    InsertPermission(Permission),
    DeletePermission(Uuid),
    InsertRolePermission(RolePermission),
    DeleteRolePermission(RolePermission),
}

/// Ordered set of mutations applied by one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_permission(&mut self, permission: Permission) -> &mut Self {
        self.changes.push(Change::InsertPermission(permission));
        self
    }

    pub fn delete_permission(&mut self, permission_id: Uuid) -> &mut Self {
        self.changes.push(Change::DeletePermission(permission_id));
        self
    }

    pub fn delete_permissions<'a>(
        &mut self,
        permissions: impl IntoIterator<Item = &'a Permission>,
    ) -> &mut Self {
        for permission in permissions {
            self.delete_permission(permission.id);
        }
        self
    }

    pub fn insert_role_permission(&mut self, grant: RolePermission) -> &mut Self {
        self.changes.push(Change::InsertRolePermission(grant));
        self
    }

    pub fn delete_role_permission(&mut self, grant: RolePermission) -> &mut Self {
        self.changes.push(Change::DeleteRolePermission(grant));
        self
    }

    pub fn delete_role_permissions(
        &mut self,
        grants: impl IntoIterator<Item = RolePermission>,
    ) -> &mut Self {
        for grant in grants {
            self.delete_role_permission(grant);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Storage capabilities needed by grant resolution, listing and catalog resets.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Find a user by exact user name.
    async fn find_user_by_name(&self, user_name: &str) -> StoreResult<Option<User>>;

    /// All roles assigned to a user.
    async fn find_roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Role>>;

    async fn find_role_by_id(&self, role_id: Uuid) -> StoreResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    /// Permissions granted to a role through its role-permission links.
    async fn find_permissions_for_role(&self, role_id: Uuid) -> StoreResult<Vec<Permission>>;

    /// Role-permission links owned by the role with the given name.
    async fn find_role_permissions_by_role_name(
        &self,
        role_name: &str,
    ) -> StoreResult<Vec<RolePermission>>;

    async fn find_all_permissions(&self) -> StoreResult<Vec<Permission>>;

    /// One page of the filtered, sorted catalog plus the total match count.
    async fn query_permissions(
        &self,
        query: &PermissionQuery,
    ) -> StoreResult<(Vec<Permission>, i64)>;

    /// Apply every staged change atomically, in order.
    async fn commit(&self, changes: ChangeSet) -> StoreResult<()>;
}
