//! Grant resolution.
//!
//! Decides whether a user (through its roles) or a role holds a permission.
//! Permissions are compared by name only. Unknown users and roles resolve to
//! "not granted" rather than an error.

use std::collections::HashSet;

use tracing::debug;

use super::models::{Permission, Principal, Role};
use super::store::{PermissionStore, StoreResult};

fn permission_names(permissions: Vec<Permission>) -> impl Iterator<Item = String> {
    permissions.into_iter().map(|p| p.name)
}

/// Check whether any role assigned to the principal's user grants `permission`.
#[tracing::instrument(skip(store, permission), fields(permission = %permission.name))]
pub async fn is_permission_granted_for_user(
    store: &dyn PermissionStore,
    principal: &Principal,
    permission: &Permission,
) -> StoreResult<bool> {
    let Some(user) = store.find_user_by_name(&principal.name).await? else {
        debug!(principal = %principal.name, "No user for principal");
        return Ok(false);
    };

    let mut granted = HashSet::new();
    for role in store.find_roles_for_user(user.id).await? {
        granted.extend(permission_names(
            store.find_permissions_for_role(role.id).await?,
        ));
    }

    Ok(granted.contains(&permission.name))
}

/// Check whether the stored role with `role.id` grants `permission`.
#[tracing::instrument(skip(store, role, permission), fields(role_id = %role.id, permission = %permission.name))]
pub async fn is_permission_granted_for_role(
    store: &dyn PermissionStore,
    role: &Role,
    permission: &Permission,
) -> StoreResult<bool> {
    let Some(existing) = store.find_role_by_id(role.id).await? else {
        debug!("Role not found");
        return Ok(false);
    };

    let granted: HashSet<String> =
        permission_names(store.find_permissions_for_role(existing.id).await?).collect();

    Ok(granted.contains(&permission.name))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::permissions::memory::MemoryPermissionStore;
    use crate::permissions::models::RolePermission;
    use crate::permissions::store::ChangeSet;

    async fn grant(store: &MemoryPermissionStore, role: &Role, permission: &Permission) {
        let mut changes = ChangeSet::new();
        changes.insert_role_permission(RolePermission {
            role_id: role.id,
            permission_id: permission.id,
        });
        store.commit(changes).await.unwrap();
    }

    async fn create(store: &MemoryPermissionStore, name: &str) -> Permission {
        let permission = Permission::new(Uuid::now_v7(), name, name);
        let mut changes = ChangeSet::new();
        changes.insert_permission(permission.clone());
        store.commit(changes).await.unwrap();
        permission
    }

    #[tokio::test]
    async fn test_unknown_principal_is_never_granted() {
        let store = MemoryPermissionStore::new();
        let permission = create(&store, "ApiUser").await;

        let granted =
            is_permission_granted_for_user(&store, &Principal::new("ghost"), &permission)
                .await
                .unwrap();
        assert!(!granted);
    }

    #[tokio::test]
    async fn test_user_granted_through_any_role() {
        let store = MemoryPermissionStore::new();
        let user = store.add_user("alice").await;
        let viewer = store.add_role("Viewer").await;
        let editor = store.add_role("Editor").await;
        store.assign_role(user.id, viewer.id).await;
        store.assign_role(user.id, editor.id).await;

        let read = create(&store, "Pages.Read").await;
        let edit = create(&store, "Pages.Edit").await;
        let delete = create(&store, "Pages.Delete").await;
        grant(&store, &viewer, &read).await;
        grant(&store, &editor, &edit).await;

        let alice = Principal::new("alice");
        assert!(is_permission_granted_for_user(&store, &alice, &read)
            .await
            .unwrap());
        assert!(is_permission_granted_for_user(&store, &alice, &edit)
            .await
            .unwrap());
        assert!(!is_permission_granted_for_user(&store, &alice, &delete)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_user_without_roles_has_no_grants() {
        let store = MemoryPermissionStore::new();
        store.add_user("bob").await;
        let permission = create(&store, "ApiUser").await;

        let granted = is_permission_granted_for_user(&store, &Principal::new("bob"), &permission)
            .await
            .unwrap();
        assert!(!granted);
    }

    #[tokio::test]
    async fn test_grants_compare_by_name_not_id() {
        let store = MemoryPermissionStore::new();
        let user = store.add_user("alice").await;
        let role = store.add_role("Editor").await;
        store.assign_role(user.id, role.id).await;
        let stored = create(&store, "ApiUser").await;
        grant(&store, &role, &stored).await;

        let rebuilt = Permission::new(Uuid::now_v7(), "ApiUser", "whatever");
        assert_ne!(rebuilt.id, stored.id);

        assert!(
            is_permission_granted_for_user(&store, &Principal::new("alice"), &rebuilt)
                .await
                .unwrap()
        );
        assert!(is_permission_granted_for_role(&store, &role, &rebuilt)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_role_is_never_granted() {
        let store = MemoryPermissionStore::new();
        let permission = create(&store, "ApiUser").await;
        let phantom = Role {
            id: Uuid::now_v7(),
            name: "Admin".into(),
        };

        assert!(!is_permission_granted_for_role(&store, &phantom, &permission)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_role_grants_are_direct_only() {
        let store = MemoryPermissionStore::new();
        let holder = store.add_role("Holder").await;
        let other = store.add_role("Other").await;
        let permission = create(&store, "Reports").await;
        grant(&store, &holder, &permission).await;

        assert!(is_permission_granted_for_role(&store, &holder, &permission)
            .await
            .unwrap());
        assert!(!is_permission_granted_for_role(&store, &other, &permission)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_role_resolved_by_id_not_name() {
        let store = MemoryPermissionStore::new();
        let holder = store.add_role("Holder").await;
        let permission = create(&store, "Reports").await;
        grant(&store, &holder, &permission).await;

        let renamed = Role {
            id: holder.id,
            name: "Stale name".into(),
        };
        assert!(is_permission_granted_for_role(&store, &renamed, &permission)
            .await
            .unwrap());
    }
}
