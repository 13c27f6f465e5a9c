//! Pagination types
//!
//! The response contract shared by every paginated data source, and the
//! partial request callers use to ask for a page.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Default page number when the request omits it
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when the request omits it
pub const DEFAULT_LIMIT: u32 = 10;

/// One page of results
///
/// A series uses either `page` (offset style) or the cursors, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct PaginationResponse<T> {
    /// Items on this page
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
    /// Total matching items across all pages, if known
    #[serde(default)]
    pub total: Option<u64>,
    /// Page size used to produce this response
    pub limit: u32,
    /// 1-based page number (offset style)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Cursor for the following page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Cursor for the preceding page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_cursor: Option<String>,
}

impl<T> PaginationResponse<T> {
    /// Create an offset-style page
    pub fn new(data: Vec<T>, total: Option<u64>, limit: u32, page: u32) -> Self {
        Self {
            data,
            total,
            limit,
            page: Some(page),
            next_cursor: None,
            prev_cursor: None,
        }
    }

    /// Create a cursor-style page
    pub fn with_cursors(
        data: Vec<T>,
        total: Option<u64>,
        limit: u32,
        next_cursor: Option<String>,
        prev_cursor: Option<String>,
    ) -> Self {
        Self {
            data,
            total,
            limit,
            page: None,
            next_cursor,
            prev_cursor,
        }
    }

    /// An empty first page
    pub fn empty(limit: u32) -> Self {
        Self::new(Vec::new(), Some(0), limit, DEFAULT_PAGE)
    }

    /// Number of items on this page
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this page has no items
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total pages implied by `total` at this page's limit
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total.unwrap_or(0), self.limit)
    }

    /// Check the contract invariants
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::invalid_response("limit must be positive"));
        }
        if self.data.len() > self.limit as usize {
            return Err(Error::invalid_response(format!(
                "page holds {} items but limit is {}",
                self.data.len(),
                self.limit
            )));
        }
        if self.page.is_some() && (self.next_cursor.is_some() || self.prev_cursor.is_some()) {
            return Err(Error::invalid_response(
                "page number and cursors cannot be mixed",
            ));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Number of pages needed for `total` items, never less than 1
pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(limit));
    pages.clamp(1, u64::from(u32::MAX)) as u32
}

/// Caller-supplied page request; missing fields use defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequest {
    /// 1-based page number
    #[serde(default)]
    pub page: Option<u32>,
    /// Page size
    #[serde(default)]
    pub limit: Option<u32>,
    /// Opaque cursor
    #[serde(default)]
    pub cursor: Option<String>,
}

impl PaginationRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a page number
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Request a page size
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Request a cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Effective page number (at least 1)
    pub fn page_or_default(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// Effective page size (at least 1)
    pub fn limit_or_default(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).max(1)
    }

    /// Resolve into a concrete window. A cursor wins over a page number.
    pub fn window(&self) -> PageWindow {
        let limit = self.limit_or_default();
        match &self.cursor {
            Some(cursor) if !cursor.is_empty() => PageWindow::Cursor {
                cursor: cursor.clone(),
                limit,
            },
            _ => PageWindow::Offset {
                offset: u64::from(self.page_or_default() - 1) * u64::from(limit),
                limit,
            },
        }
    }
}

/// A resolved slice of a result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageWindow {
    /// Rows `[offset, offset + limit)`
    Offset { offset: u64, limit: u32 },
    /// Rows strictly after `cursor`
    Cursor { cursor: String, limit: u32 },
}

impl PageWindow {
    /// Page size of this window
    pub fn limit(&self) -> u32 {
        match self {
            Self::Offset { limit, .. } | Self::Cursor { limit, .. } => *limit,
        }
    }

    /// 1-based page number for offset windows
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Offset { offset, limit } => Some((offset / u64::from(*limit)) as u32 + 1),
            Self::Cursor { .. } => None,
        }
    }
}
