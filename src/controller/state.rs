//! Controller state machine
//!
//! All controller state changes go through [`ControllerState::apply`]. The
//! async driver decides *which* action to apply; this module only says what
//! each action does to the state.

use crate::compare::deep_equal_filters;
use crate::error::Error;
use crate::pagination::{total_pages, PaginationResponse, DEFAULT_PAGE};
use crate::types::Filters;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Derived pagination view of the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    /// 1-based visible page
    pub current_page: u32,
    /// Page size
    pub limit: u32,
    /// `max(1, ceil(total / limit))`
    pub total_pages: u32,
    /// `current_page < total_pages`
    pub has_next_page: bool,
    /// `current_page > 1`
    pub has_previous_page: bool,
    /// Total items reported by the displayed response, 0 when unknown
    pub total: u64,
    /// A navigation is resolving
    pub is_changing_page: bool,
}

/// Immutable view published to subscribers after every transition
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Displayed response
    pub response: Option<Arc<PaginationResponse<T>>>,
    /// Last foreground error
    pub error: Option<Arc<Error>>,
    /// Pagination view
    pub pagination: PaginationInfo,
    /// Nothing has been displayed yet and nothing failed
    pub is_loading: bool,
    /// A fetch of the current page is in flight, or a navigation is resolving
    pub is_fetching: bool,
    /// `error` is set
    pub is_error: bool,
    /// When the displayed response was committed
    pub data_updated_at: Option<DateTime<Utc>>,
}

impl<T> Snapshot<T> {
    /// Items of the displayed page; empty when nothing is displayed
    pub fn data(&self) -> &[T] {
        self.response.as_deref().map_or(&[], |r| r.data.as_slice())
    }

    /// Total items, 0 when unknown
    pub fn total(&self) -> u64 {
        self.pagination.total
    }
}

/// Inputs to [`ControllerState::apply`]
#[derive(Debug)]
pub enum Action<T> {
    /// `go_to_page` passed clamping and began resolving
    NavigationStarted,
    /// Target data is available; switch the visible page
    NavigationSucceeded {
        page: u32,
        response: Arc<PaginationResponse<T>>,
    },
    /// Target fetch failed; stay on the current page
    NavigationFailed { error: Arc<Error> },
    /// Filters or limit moved on while resolving; drop the navigation
    NavigationAbandoned,
    /// Caller supplied new filters or limit (already normalized)
    Reconfigured { filters: Option<Filters>, limit: u32 },
    /// Debounced filters reached the controller
    FiltersCommitted { filters: Option<Filters> },
    /// A fetch for the current key started
    FetchStarted,
    /// A fetch for the current key settled
    FetchSettled,
    /// The current key resolved to `response`
    Loaded {
        response: Arc<PaginationResponse<T>>,
        at: DateTime<Utc>,
    },
    /// The current key failed to resolve
    Failed { error: Arc<Error> },
}

/// Mutable controller state
#[derive(Debug)]
pub struct ControllerState<T> {
    /// 1-based visible page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Committed (debounced, normalized) filters
    pub filters: Option<Filters>,
    /// Last filters the caller supplied, normalized
    pub observed_filters: Option<Filters>,
    /// Last limit the caller supplied
    pub observed_limit: u32,
    /// A navigation is resolving
    pub is_changing_page: bool,
    /// Fetches in flight for the current key
    pub fetching: u32,
    /// Displayed response, kept while a new key loads
    pub response: Option<Arc<PaginationResponse<T>>>,
    /// Last foreground error
    pub error: Option<Arc<Error>>,
    /// When `response` was committed
    pub data_updated_at: Option<DateTime<Utc>>,
    /// Virtual pages may still be consulted
    pub virtual_active: bool,
}

impl<T> ControllerState<T> {
    /// State of a freshly built controller
    pub fn new(limit: u32, filters: Option<Filters>, virtual_active: bool) -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit,
            observed_filters: filters.clone(),
            filters,
            observed_limit: limit,
            is_changing_page: false,
            fetching: 0,
            response: None,
            error: None,
            data_updated_at: None,
            virtual_active,
        }
    }

    /// Apply one transition
    pub fn apply(&mut self, action: Action<T>) {
        match action {
            Action::NavigationStarted => {
                self.is_changing_page = true;
            }
            Action::NavigationSucceeded { page, response } => {
                self.page = page;
                self.is_changing_page = false;
                self.commit(response, Utc::now());
            }
            Action::NavigationFailed { error } => {
                self.is_changing_page = false;
                self.error = Some(error);
            }
            Action::NavigationAbandoned => {
                self.is_changing_page = false;
            }
            Action::Reconfigured { filters, limit } => {
                if limit != self.limit {
                    self.virtual_active = false;
                }
                self.page = DEFAULT_PAGE;
                self.limit = limit;
                self.observed_filters = filters;
                self.observed_limit = limit;
            }
            Action::FiltersCommitted { filters } => {
                self.filters = filters;
                self.virtual_active = false;
            }
            Action::FetchStarted => {
                self.fetching += 1;
            }
            Action::FetchSettled => {
                self.fetching = self.fetching.saturating_sub(1);
            }
            Action::Loaded { response, at } => {
                self.commit(response, at);
            }
            Action::Failed { error } => {
                self.error = Some(error);
            }
        }
    }

    fn commit(&mut self, response: Arc<PaginationResponse<T>>, at: DateTime<Utc>) {
        self.response = Some(response);
        self.error = None;
        self.data_updated_at = Some(at);
    }

    /// Whether `filters` / `limit` differ from what the caller last supplied
    pub fn is_reconfiguration(&self, filters: Option<&Filters>, limit: u32) -> bool {
        limit != self.observed_limit || !deep_equal_filters(filters, self.observed_filters.as_ref())
    }

    /// Derived pagination view
    pub fn pagination(&self) -> PaginationInfo {
        let total = self.response.as_ref().and_then(|r| r.total).unwrap_or(0);
        let total_pages = total_pages(total, self.limit);
        PaginationInfo {
            current_page: self.page,
            limit: self.limit,
            total_pages,
            has_next_page: self.page < total_pages,
            has_previous_page: self.page > 1,
            total,
            is_changing_page: self.is_changing_page,
        }
    }

    /// Snapshot for subscribers
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            response: self.response.clone(),
            error: self.error.clone(),
            pagination: self.pagination(),
            is_loading: self.response.is_none() && self.error.is_none(),
            is_fetching: self.fetching > 0 || self.is_changing_page,
            is_error: self.error.is_some(),
            data_updated_at: self.data_updated_at,
        }
    }
}
