//! Catalog listing: filtering, sorting and paging.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::PermissionServiceError;
use super::models::{Permission, PermissionListItem};
use super::store::PermissionStore;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Caller-facing listing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPermissionsInput {
    /// Substring matched against name and display name.
    pub filter: Option<String>,
    /// `"<field> [asc|desc]"`, e.g. `"displayName desc"`.
    pub sorting: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Zero-based page number.
    #[serde(default)]
    pub page_index: i64,
}

#[allow(clippy::missing_const_for_fn)]
fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for GetPermissionsInput {
    fn default() -> Self {
        Self {
            filter: None,
            sorting: None,
            page_size: DEFAULT_PAGE_SIZE,
            page_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    DisplayName,
}

impl SortField {
    /// Column name; only ever one of a fixed set so it is safe to splice into SQL.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::DisplayName => "display_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl FromStr for PermissionSort {
    type Err = PermissionServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PermissionServiceError::InvalidSorting(s.to_string());
        let mut parts = s.split_whitespace();

        let field = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("name") => SortField::Name,
            Some("displayname" | "display_name") => SortField::DisplayName,
            _ => return Err(invalid()),
        };
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { field, direction })
    }
}

/// Normalized listing query handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionQuery {
    /// Trimmed, non-empty filter.
    pub filter: Option<String>,
    pub sort: PermissionSort,
    pub page_size: i64,
    pub page_index: i64,
}

impl PermissionQuery {
    pub fn from_input(input: &GetPermissionsInput) -> Result<Self, PermissionServiceError> {
        let filter = input
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(ToString::to_string);

        let sort = match input.sorting.as_deref().map(str::trim) {
            None | Some("") => PermissionSort::default(),
            Some(expr) => expr.parse()?,
        };

        Ok(Self {
            filter,
            sort,
            page_size: input.page_size.clamp(1, MAX_PAGE_SIZE),
            page_index: input.page_index.max(0),
        })
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.page_size
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Case-insensitive substring match on name or display name.
    #[must_use]
    pub fn matches(&self, permission: &Permission) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let needle = filter.to_lowercase();
        permission.name.to_lowercase().contains(&needle)
            || permission.display_name.to_lowercase().contains(&needle)
    }

    /// Ordering used for listing; ties break on id.
    ///
    /// Strings compare byte-wise, so upper case sorts before lower case. The
    /// `PostgreSQL` store sorts with `COLLATE "C"` to agree.
    #[must_use]
    pub fn compare(&self, a: &Permission, b: &Permission) -> Ordering {
        let primary = match self.sort.field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::DisplayName => a.display_name.cmp(&b.display_name),
        };
        let primary = match self.sort.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_index: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PagedList<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total_count: i64, page_index: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            items,
            total_count,
            page_index,
            page_size,
            total_pages,
        }
    }
}

/// List the catalog with filtering, sorting and paging.
#[tracing::instrument(skip(store))]
pub async fn get_permissions(
    store: &dyn PermissionStore,
    input: &GetPermissionsInput,
) -> Result<PagedList<PermissionListItem>, PermissionServiceError> {
    let query = PermissionQuery::from_input(input)?;
    let (permissions, total) = store.query_permissions(&query).await?;

    debug!(
        total,
        returned = permissions.len(),
        page_index = query.page_index,
        "Listed permissions"
    );

    let items = permissions.into_iter().map(PermissionListItem::from).collect();
    Ok(PagedList::new(items, total, query.page_index, query.page_size))
}
