//! Page window arithmetic

use serde::{Deserialize, Serialize};

use super::PaginationError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Validated page parameters as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    /// Create a page request.
    ///
    /// Pages below 1 are normalized to 1. A limit of zero or less is rejected.
    pub fn new(page: i64, limit: i64) -> Result<Self, PaginationError> {
        if limit <= 0 {
            return Err(PaginationError::InvalidLimit(format!(
                "limit must be positive (got {})",
                limit
            )));
        }
        Ok(Self {
            page: page.max(1),
            limit,
        })
    }

    /// Parse raw query-string values, applying defaults for absent ones.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, PaginationError> {
        let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| PaginationError::InvalidPage(raw.to_string()))?,
            None => DEFAULT_PAGE,
        };
        let limit = match limit.map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| PaginationError::InvalidLimit(raw.to_string()))?,
            None => DEFAULT_LIMIT,
        };
        Self::new(page, limit)
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Resolve the request against the number of matching rows.
    pub fn window(&self, total_items: i64) -> PageWindow {
        PageWindow::compute(total_items, self.page, self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned with every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

/// Resolved page: metadata plus the SQL offset/limit to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub pagination: Pagination,
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Compute the window for `total_items` rows.
    ///
    /// The page is clamped into `1..=total_pages`, so a request past the end
    /// yields the last page. With no rows the window is page 1 of 0.
    pub fn compute(total_items: i64, page: i64, limit: i64) -> Self {
        let total_items = total_items.max(0);
        let limit = limit.max(1);

        let mut total_pages = total_items / limit + i64::from(total_items % limit != 0);
        if total_pages == 0 && total_items > 0 {
            total_pages = 1;
        }

        let mut current_page = page.max(1);
        if total_pages > 0 && current_page > total_pages {
            current_page = total_pages;
        }
        if total_pages == 0 {
            current_page = 1;
        }

        Self {
            pagination: Pagination {
                current_page,
                total_pages,
                total_items,
            },
            offset: (current_page - 1).saturating_mul(limit),
            limit,
        }
    }

    /// True when there is nothing to fetch.
    pub fn is_empty(&self) -> bool {
        self.pagination.total_items == 0
    }
}

/// A fetched window of records with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
