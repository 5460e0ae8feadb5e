//! Permission application service.

use std::sync::Arc;

use tracing::info;

use super::catalog;
use super::error::PermissionServiceError;
use super::initializer;
use super::listing::{self, GetPermissionsInput, PagedList};
use super::models::{Permission, PermissionListItem, Principal, Role};
use super::resolver;
use super::store::{ChangeSet, PermissionStore};

/// Entry point for catalog listing, grant checks and catalog resets.
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn PermissionStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub async fn get_permissions(
        &self,
        input: &GetPermissionsInput,
    ) -> Result<PagedList<PermissionListItem>, PermissionServiceError> {
        listing::get_permissions(self.store.as_ref(), input).await
    }

    pub async fn is_permission_granted_for_user(
        &self,
        principal: &Principal,
        permission: &Permission,
    ) -> Result<bool, PermissionServiceError> {
        Ok(
            resolver::is_permission_granted_for_user(self.store.as_ref(), principal, permission)
                .await?,
        )
    }

    pub async fn is_permission_granted_for_role(
        &self,
        role: &Role,
        permission: &Permission,
    ) -> Result<bool, PermissionServiceError> {
        Ok(resolver::is_permission_granted_for_role(self.store.as_ref(), role, permission).await?)
    }

    /// Add a single permission to the catalog. No role is granted it.
    #[tracing::instrument(skip(self, permission), fields(name = %permission.name))]
    pub async fn create_permission(
        &self,
        permission: Permission,
    ) -> Result<(), PermissionServiceError> {
        let mut changes = ChangeSet::new();
        changes.insert_permission(permission);
        self.store.commit(changes).await?;
        info!("Permission created");
        Ok(())
    }

    /// See [`initializer::initialize_permissions`].
    pub async fn initialize_permissions(
        &self,
        permissions: &[Permission],
    ) -> Result<(), PermissionServiceError> {
        initializer::initialize_permissions(self.store.as_ref(), permissions).await
    }

    /// Reset the catalog to the permissions shipped with the application.
    pub async fn sync_catalog(&self) -> Result<(), PermissionServiceError> {
        self.initialize_permissions(&catalog::all_permissions())
            .await
    }
}
