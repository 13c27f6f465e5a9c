//! Pagination module
//!
//! Supports: offset (page number) and cursor pagination contracts
//!
//! # Overview
//!
//! `PaginationResponse<T>` is the shape every paginated data source
//! returns. `PaginationRequest` is the partial request a caller sends, and
//! `VirtualPageMap` slices one over-fetched payload into local pages.

mod types;
mod virtual_pages;

pub use types::{
    total_pages, PageWindow, PaginationRequest, PaginationResponse, DEFAULT_LIMIT, DEFAULT_PAGE,
};
pub use virtual_pages::{VirtualPageMap, VirtualPageRequest};
