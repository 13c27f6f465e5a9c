//! Pagination controller module
//!
//! Orchestrates virtual pages, the query cache and the page fetcher for one
//! paginated list.
//!
//! # Overview
//!
//! - `PaginationController` - navigation, filter/limit changes, prefetch, refetch
//! - `ControllerState` / `Action` - the explicit state machine behind it
//! - `Snapshot` / `PaginationInfo` - what subscribers observe
//!
//! # Example
//!
//! ```ignore
//! let controller = PaginationController::builder(QueryKey::base(&["orders"]), source)
//!     .config(ControllerConfig::builder().limit(25).build())
//!     .build()?;
//! controller.load().await;
//! controller.next_page().await;
//! ```

mod pager;
mod state;

pub use pager::{PaginationController, PaginationControllerBuilder};
pub use state::{Action, ControllerState, PaginationInfo, Snapshot};
