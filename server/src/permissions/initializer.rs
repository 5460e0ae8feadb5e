//! Permission catalog reinitialization.
//!
//! Replaces the whole catalog and the admin role's grants with an
//! authoritative list. Runs as three commits that must stay in this order:
//!
//! 1. delete the admin role's grants
//! 2. delete every permission
//! 3. insert the new permissions, each with a fresh admin grant
//!
//! Grants may not outlive the permissions they reference, so the phases are
//! never merged or reordered. A failure in a later phase leaves the earlier
//! phases committed.

use tracing::{info, warn};

use super::error::PermissionServiceError;
use super::models::{Permission, RolePermission, ADMIN_ROLE_NAME};
use super::store::{ChangeSet, PermissionStore};

/// Reset the catalog to `permissions` and grant all of them to the admin role.
#[tracing::instrument(skip(store, permissions), fields(count = permissions.len()))]
pub async fn initialize_permissions(
    store: &dyn PermissionStore,
    permissions: &[Permission],
) -> Result<(), PermissionServiceError> {
    let admin_grants = store
        .find_role_permissions_by_role_name(ADMIN_ROLE_NAME)
        .await?;
    let mut changes = ChangeSet::new();
    changes.delete_role_permissions(admin_grants.iter().copied());
    store.commit(changes).await?;
    info!(removed = admin_grants.len(), "Removed admin role grants");

    let existing = store.find_all_permissions().await?;
    let mut changes = ChangeSet::new();
    changes.delete_permissions(&existing);
    store.commit(changes).await?;
    info!(removed = existing.len(), "Cleared permission catalog");

    let mut changes = ChangeSet::new();
    for permission in permissions {
        changes.insert_permission(permission.clone());

        let Some(admin_role) = store.find_role_by_name(ADMIN_ROLE_NAME).await? else {
            warn!(role = ADMIN_ROLE_NAME, "Admin role missing; catalog left empty");
            return Err(PermissionServiceError::AdminRoleMissing(
                ADMIN_ROLE_NAME.to_string(),
            ));
        };
        changes.insert_role_permission(RolePermission {
            role_id: admin_role.id,
            permission_id: permission.id,
        });
    }
    store.commit(changes).await?;

    info!(inserted = permissions.len(), "Permission catalog initialized");
    Ok(())
}
