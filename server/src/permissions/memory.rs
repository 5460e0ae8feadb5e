//! In-process permission store.
//!
//! Enforces the same uniqueness and referential rules as the `PostgreSQL`
//! schema so callers observe identical failure modes. A commit is validated
//! against a scratch copy and only swapped in when every change succeeds.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::listing::PermissionQuery;
use super::models::{Permission, Role, RolePermission, User, UserRole};
use super::store::{Change, ChangeSet, PermissionStore, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct State {
    users: BTreeMap<Uuid, User>,
    roles: BTreeMap<Uuid, Role>,
    user_roles: HashSet<UserRole>,
    permissions: BTreeMap<Uuid, Permission>,
    role_permissions: HashSet<RolePermission>,
}

impl State {
    fn apply(&mut self, change: Change) -> StoreResult<()> {
        match change {
            Change::InsertPermission(permission) => {
                if self.permissions.contains_key(&permission.id) {
                    return Err(StoreError::Constraint(format!(
                        "duplicate permission id {}",
                        permission.id
                    )));
                }
                if self.permissions.values().any(|p| p.name == permission.name) {
                    return Err(StoreError::Constraint(format!(
                        "duplicate permission name '{}'",
                        permission.name
                    )));
                }
                self.permissions.insert(permission.id, permission);
            }
            Change::DeletePermission(permission_id) => {
                if self
                    .role_permissions
                    .iter()
                    .any(|rp| rp.permission_id == permission_id)
                {
                    return Err(StoreError::Constraint(format!(
                        "permission {permission_id} is still granted to a role"
                    )));
                }
                self.permissions.remove(&permission_id);
            }
            Change::InsertRolePermission(grant) => {
                if !self.roles.contains_key(&grant.role_id) {
                    return Err(StoreError::Constraint(format!(
                        "role {} does not exist",
                        grant.role_id
                    )));
                }
                if !self.permissions.contains_key(&grant.permission_id) {
                    return Err(StoreError::Constraint(format!(
                        "permission {} does not exist",
                        grant.permission_id
                    )));
                }
                if !self.role_permissions.insert(grant) {
                    return Err(StoreError::Constraint(format!(
                        "role {} already holds permission {}",
                        grant.role_id, grant.permission_id
                    )));
                }
            }
            Change::DeleteRolePermission(grant) => {
                self.role_permissions.remove(&grant);
            }
        }
        Ok(())
    }
}

/// Permission store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    state: RwLock<State>,
}

impl MemoryPermissionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user. Users are owned outside the permission system.
    pub async fn add_user(&self, user_name: impl Into<String>) -> User {
        let user = User {
            id: Uuid::now_v7(),
            user_name: user_name.into(),
        };
        self.state.write().await.users.insert(user.id, user.clone());
        user
    }

    /// Seed a role.
    pub async fn add_role(&self, name: impl Into<String>) -> Role {
        let role = Role {
            id: Uuid::now_v7(),
            name: name.into(),
        };
        self.state.write().await.roles.insert(role.id, role.clone());
        role
    }

    /// Assign a seeded role to a seeded user.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) {
        self.state
            .write()
            .await
            .user_roles
            .insert(UserRole { user_id, role_id });
    }

    /// Number of grants currently held by a role.
    pub async fn grant_count(&self, role_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .role_permissions
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .count()
    }

    /// Total number of grants across all roles.
    pub async fn total_grant_count(&self) -> usize {
        self.state.read().await.role_permissions.len()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn find_user_by_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.user_name == user_name)
            .cloned())
    }

    async fn find_roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .iter()
            .filter(|ur| ur.user_id == user_id)
            .filter_map(|ur| state.roles.get(&ur.role_id).cloned())
            .collect())
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> StoreResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.values().find(|r| r.name == name).cloned())
    }

    async fn find_permissions_for_role(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .role_permissions
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .filter_map(|rp| state.permissions.get(&rp.permission_id).cloned())
            .collect())
    }

    async fn find_role_permissions_by_role_name(
        &self,
        role_name: &str,
    ) -> StoreResult<Vec<RolePermission>> {
        let state = self.state.read().await;
        let role_ids: HashSet<Uuid> = state
            .roles
            .values()
            .filter(|r| r.name == role_name)
            .map(|r| r.id)
            .collect();

        Ok(state
            .role_permissions
            .iter()
            .filter(|rp| role_ids.contains(&rp.role_id))
            .copied()
            .collect())
    }

    async fn find_all_permissions(&self) -> StoreResult<Vec<Permission>> {
        Ok(self.state.read().await.permissions.values().cloned().collect())
    }

    async fn query_permissions(
        &self,
        query: &PermissionQuery,
    ) -> StoreResult<(Vec<Permission>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&Permission> = state
            .permissions
            .values()
            .filter(|p| query.matches(p))
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(0);

        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let mut scratch = state.clone();
        for change in changes {
            scratch.apply(change)?;
        }
        *state = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::listing::GetPermissionsInput;

    fn permission(name: &str, display_name: &str) -> Permission {
        Permission::new(Uuid::now_v7(), name, display_name)
    }

    #[tokio::test]
    async fn test_commit_applies_changes_in_order() {
        let store = MemoryPermissionStore::new();
        let role = store.add_role("Editor").await;
        let perm = permission("Pages.Edit", "Edit pages");

        let mut changes = ChangeSet::new();
        changes
            .insert_permission(perm.clone())
            .insert_role_permission(RolePermission {
                role_id: role.id,
                permission_id: perm.id,
            });
        store.commit(changes).await.unwrap();

        let granted = store.find_permissions_for_role(role.id).await.unwrap();
        assert_eq!(granted, vec![perm]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_and_state_untouched() {
        let store = MemoryPermissionStore::new();
        let first = permission("ApiUser", "Api user");
        let mut changes = ChangeSet::new();
        changes.insert_permission(first.clone());
        store.commit(changes).await.unwrap();

        let mut changes = ChangeSet::new();
        changes
            .insert_permission(permission("Other", "Other"))
            .insert_permission(permission("ApiUser", "Clone"));
        let result = store.commit(changes).await;

        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert_eq!(store.find_all_permissions().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_dangling_grant_rejected() {
        let store = MemoryPermissionStore::new();
        let role = store.add_role("Editor").await;

        let mut changes = ChangeSet::new();
        changes.insert_role_permission(RolePermission {
            role_id: role.id,
            permission_id: Uuid::now_v7(),
        });

        assert!(matches!(
            store.commit(changes).await,
            Err(StoreError::Constraint(_))
        ));
        assert_eq!(store.grant_count(role.id).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_grant_rejected() {
        let store = MemoryPermissionStore::new();
        let role = store.add_role("Editor").await;
        let perm = permission("Pages.Edit", "Edit pages");
        let grant = RolePermission {
            role_id: role.id,
            permission_id: perm.id,
        };

        let mut changes = ChangeSet::new();
        changes
            .insert_permission(perm)
            .insert_role_permission(grant)
            .insert_role_permission(grant);

        assert!(store.commit(changes).await.is_err());
        assert_eq!(store.total_grant_count().await, 0);
    }

    #[tokio::test]
    async fn test_granted_permission_cannot_be_deleted() {
        let store = MemoryPermissionStore::new();
        let role = store.add_role("Editor").await;
        let perm = permission("Pages.Edit", "Edit pages");

        let mut changes = ChangeSet::new();
        changes
            .insert_permission(perm.clone())
            .insert_role_permission(RolePermission {
                role_id: role.id,
                permission_id: perm.id,
            });
        store.commit(changes).await.unwrap();

        let mut changes = ChangeSet::new();
        changes.delete_permission(perm.id);
        assert!(store.commit(changes).await.is_err());
        assert_eq!(store.find_all_permissions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_roles_for_user() {
        let store = MemoryPermissionStore::new();
        let user = store.add_user("alice").await;
        let editor = store.add_role("Editor").await;
        let _viewer = store.add_role("Viewer").await;
        store.assign_role(user.id, editor.id).await;

        let found = store.find_user_by_name("alice").await.unwrap().unwrap();
        assert_eq!(found, user);
        assert!(store.find_user_by_name("Alice").await.unwrap().is_none());

        let roles = store.find_roles_for_user(user.id).await.unwrap();
        assert_eq!(roles, vec![editor]);
    }

    #[tokio::test]
    async fn test_query_permissions_pages_sorted_matches() {
        let store = MemoryPermissionStore::new();
        let mut changes = ChangeSet::new();
        for (name, display) in [
            ("Users.Read", "Read users"),
            ("Users.Write", "Write users"),
            ("Roles.Read", "Read roles"),
            ("ApiUser", "Api user"),
        ] {
            changes.insert_permission(permission(name, display));
        }
        store.commit(changes).await.unwrap();

        let query = PermissionQuery::from_input(&GetPermissionsInput {
            filter: Some("USERS".into()),
            sorting: Some("name desc".into()),
            page_size: 1,
            page_index: 1,
        })
        .unwrap();
        let (page, total) = store.query_permissions(&query).await.unwrap();

        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Users.Read");
    }
}
