//! Offset pagination, search and sort parameters shared by list endpoints.

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

pub const POST_SORT_COLUMNS: &[&str] = &["id", "title", "created_at", "updated_at"];
pub const COMMENT_SORT_COLUMNS: &[&str] = &["id", "author_name", "created_at"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("cannot sort by `{0}`")]
    UnknownSortColumn(String),
}

/// Raw list parameters as supplied by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort column taken from an allow-list, safe to splice into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Normalized list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: Option<Sort>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl QueryParams {
    pub fn normalize(&self, sortable: &'static [&'static str]) -> Result<ListQuery, QueryError> {
        let page = match self.page {
            Some(page) if page >= 1 => u32::try_from(page).unwrap_or(u32::MAX),
            _ => 1,
        };
        let page_size = match self.page_size {
            Some(size) if size >= 1 => u32::try_from(size.min(i64::from(MAX_PAGE_SIZE)))
                .unwrap_or(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };

        let search = self.search.as_deref().and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        let sort = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(requested) => {
                let column = sortable
                    .iter()
                    .copied()
                    .find(|candidate| *candidate == requested)
                    .ok_or_else(|| QueryError::UnknownSortColumn(requested.to_string()))?;
                let direction = match self.sort_order.as_deref() {
                    Some(order) if order.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    _ => SortDirection::Asc,
                };
                Some(Sort { column, direction })
            }
        };

        Ok(ListQuery {
            search,
            sort,
            page,
            page_size,
        })
    }
}
