//! Permissions shipped with the application.
//!
//! Ids are fixed so the catalog can be re-synchronized without orphaning
//! references held by other systems.

use uuid::Uuid;

use super::models::Permission;

/// Access to the public API.
pub const API_USER: &str = "ApiUser";

const API_USER_ID: Uuid = Uuid::from_u128(0x28126ffd_51c2_4201_939c_b64e3df43b9d);

/// Returns the authoritative permission catalog, in insertion order.
#[must_use]
pub fn all_permissions() -> Vec<Permission> {
    vec![Permission::new(API_USER_ID, API_USER, "Api user")]
}
