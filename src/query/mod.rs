//! Query module
//!
//! Server-side application of filters, sorts and pagination to in-memory
//! JSON records, producing the shared `PaginationResponse` contract.
//!
//! A cursor takes precedence over a page number. Totals are counted
//! whenever pagination is requested.

mod engine;
mod types;

pub use engine::{apply_query, compare_values, lookup};
pub use types::{FilterClause, FilterOperator, QueryConfig, SortClause};

#[cfg(test)]
mod tests;
