//! Virtual page synthesis
//!
//! Slices an already-fetched, over-sized first payload into same-sized pages
//! so navigation right after the first render needs no network round trip.

use super::types::{total_pages, PaginationResponse};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inputs that decide whether virtual pages can be synthesized
#[derive(Debug)]
pub struct VirtualPageRequest<'a, T> {
    /// Feature flag
    pub enabled: bool,
    /// Initial payload, if the caller had one
    pub initial: Option<&'a PaginationResponse<T>>,
    /// Still the owner's first mount
    pub first_mount: bool,
    /// Page size currently configured
    pub limit: u32,
    /// Whether any normalized filter is active
    pub filters_active: bool,
}

/// Pages sliced from one initial payload; read-only once built
#[derive(Debug)]
pub struct VirtualPageMap<T> {
    limit: u32,
    pages: BTreeMap<u32, Arc<PaginationResponse<T>>>,
}

impl<T: Clone> VirtualPageMap<T> {
    /// Build the map, or `None` when any precondition fails.
    ///
    /// Synthesis is skipped when the payload was produced with a smaller
    /// limit than the configured one. A larger payload limit is sliced.
    pub fn build(request: &VirtualPageRequest<'_, T>) -> Option<Self> {
        let initial = request.initial?;
        if !request.enabled
            || !request.first_mount
            || request.filters_active
            || request.limit == 0
            || initial.limit < request.limit
        {
            return None;
        }
        Some(Self::slice(initial, request.limit))
    }

    /// Slice `initial` into pages of `limit` items without checking preconditions
    pub fn slice(initial: &PaginationResponse<T>, limit: u32) -> Self {
        let total_items = initial.total.unwrap_or(initial.data.len() as u64);
        // Pages past the payload would be empty; only slice what was received
        let sliced = total_pages(initial.data.len() as u64, limit);
        let page_count = total_pages(total_items, limit).min(sliced);

        let mut pages = BTreeMap::new();
        pages.insert(
            1,
            Arc::new(PaginationResponse::new(Vec::new(), Some(total_items), limit, 1)),
        );
        if limit == 0 {
            return Self { limit, pages };
        }
        for (index, chunk) in initial.data.chunks(limit as usize).enumerate() {
            let page = index as u32 + 1;
            if page > page_count {
                break;
            }
            pages.insert(
                page,
                Arc::new(PaginationResponse::new(
                    chunk.to_vec(),
                    Some(total_items),
                    limit,
                    page,
                )),
            );
        }

        Self { limit, pages }
    }
}

impl<T> VirtualPageMap<T> {
    /// Page slice for `page`
    pub fn get(&self, page: u32) -> Option<Arc<PaginationResponse<T>>> {
        self.pages.get(&page).cloned()
    }

    /// Check if `page` was synthesized
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    /// Limit the pages were sliced at
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of synthesized pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if no pages were synthesized
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Synthesized page numbers in order
    pub fn page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }
}
