//! Permission system.
//!
//! Role-based grants over a named permission catalog:
//! - Grant resolution for users (through their roles) and for roles
//! - Catalog listing with filtering, sorting and paging
//! - Catalog reinitialization for the admin role

pub mod catalog;
pub mod error;
pub mod initializer;
pub mod listing;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod resolver;
pub mod service;
pub mod store;

pub use error::PermissionServiceError;
pub use initializer::initialize_permissions;
pub use listing::{get_permissions, GetPermissionsInput, PagedList, PermissionQuery};
pub use memory::MemoryPermissionStore;
pub use models::*;
pub use postgres::PgPermissionStore;
pub use resolver::{is_permission_granted_for_role, is_permission_granted_for_user};
pub use service::PermissionService;
pub use store::{Change, ChangeSet, PermissionStore, StoreError, StoreResult};
