//! Permission service error types.

use super::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PermissionServiceError {
    /// The admin role has not been seeded.
    #[error("Role '{0}' not found; it must exist before permissions are initialized")]
    AdminRoleMissing(String),

    /// Sorting expression names an unknown field or direction.
    #[error("Invalid sorting: {0}")]
    InvalidSorting(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
