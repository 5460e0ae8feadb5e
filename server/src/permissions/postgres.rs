//! `PostgreSQL`-backed permission store.
//!
//! Each [`ChangeSet`] is applied inside one transaction.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::listing::PermissionQuery;
use super::models::{Permission, Role, RolePermission, User};
use super::store::{Change, ChangeSet, PermissionStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique and foreign-key violations surface as constraint errors, matching the memory store.
fn map_commit_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
        {
            StoreError::Constraint(db_err.message().to_string())
        }
        other => StoreError::Database(other),
    }
}

/// Escape `LIKE` wildcards so the filter is matched literally.
fn like_pattern(filter: &str) -> String {
    let escaped = filter
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, query: &PermissionQuery) {
    if let Some(filter) = &query.filter {
        let pattern = like_pattern(filter);
        builder
            .push(" WHERE name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR display_name ILIKE ")
            .push_bind(pattern);
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn find_user_by_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, user_name
            FROM users
            WHERE user_name = $1
            ",
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_roles_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r"
            SELECT r.id, r.name
            FROM roles r
            INNER JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> StoreResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn find_permissions_for_role(&self, role_id: Uuid) -> StoreResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r"
            SELECT p.id, p.name, p.display_name
            FROM permissions p
            INNER JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn find_role_permissions_by_role_name(
        &self,
        role_name: &str,
    ) -> StoreResult<Vec<RolePermission>> {
        let grants = sqlx::query_as::<_, RolePermission>(
            r"
            SELECT rp.role_id, rp.permission_id
            FROM role_permissions rp
            INNER JOIN roles r ON r.id = rp.role_id
            WHERE r.name = $1
            ",
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    async fn find_all_permissions(&self) -> StoreResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"SELECT id, name, display_name FROM permissions ORDER BY name COLLATE "C" ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn query_permissions(
        &self,
        query: &PermissionQuery,
    ) -> StoreResult<(Vec<Permission>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM permissions");
        push_filter(&mut count, query);
        let (total,) = count
            .build_query_as::<(i64,)>()
            .fetch_one(&self.pool)
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new("SELECT id, name, display_name FROM permissions");
        push_filter(&mut select, query);
        // Column and direction come from closed enums, never from caller text.
        // Byte-wise collation keeps ordering identical to the memory store.
        select
            .push(" ORDER BY ")
            .push(query.sort.field.column())
            .push(r#" COLLATE "C" "#)
            .push(query.sort.direction.keyword())
            .push(", id ASC LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let permissions = select
            .build_query_as::<Permission>()
            .fetch_all(&self.pool)
            .await?;

        Ok((permissions, total))
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change {
                Change::InsertPermission(permission) => {
                    sqlx::query(
                        "INSERT INTO permissions (id, name, display_name) VALUES ($1, $2, $3)",
                    )
                    .bind(permission.id)
                    .bind(&permission.name)
                    .bind(&permission.display_name)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_commit_error)?;
                }
                Change::DeletePermission(permission_id) => {
                    sqlx::query("DELETE FROM permissions WHERE id = $1")
                        .bind(permission_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_commit_error)?;
                }
                Change::InsertRolePermission(grant) => {
                    sqlx::query(
                        "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)",
                    )
                    .bind(grant.role_id)
                    .bind(grant.permission_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_commit_error)?;
                }
                Change::DeleteRolePermission(grant) => {
                    sqlx::query(
                        "DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2",
                    )
                    .bind(grant.role_id)
                    .bind(grant.permission_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_commit_error)?;
                }
            }
        }

        tx.commit().await.map_err(map_commit_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("api"), "%api%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_non_constraint_errors_stay_database_errors() {
        assert!(matches!(
            map_commit_error(sqlx::Error::RowNotFound),
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
        assert!(matches!(
            map_commit_error(sqlx::Error::PoolTimedOut),
            StoreError::Database(_)
        ));
    }
}
