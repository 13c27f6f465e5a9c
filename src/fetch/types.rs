//! Page fetcher abstraction

use crate::error::Result;
use crate::pagination::PaginationResponse;
use crate::types::Filters;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// A source of pages
///
/// Implementations receive the normalized filter map (or `None`) and return
/// one page. Errors that carry a status in `400..500` are never retried.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetch `page` (1-based) holding at most `limit` items
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&Filters>,
    ) -> Result<PaginationResponse<T>>;
}

#[async_trait]
impl<T, P> PageFetcher<T> for Arc<P>
where
    T: Send,
    P: PageFetcher<T> + ?Sized,
{
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&Filters>,
    ) -> Result<PaginationResponse<T>> {
        (**self).fetch_page(page, limit, filters).await
    }
}

type FetchFn<T> =
    dyn Fn(u32, u32, Option<Filters>) -> BoxFuture<'static, Result<PaginationResponse<T>>>
        + Send
        + Sync;

/// Adapts an async closure into a `PageFetcher`
pub struct FnFetcher<T> {
    f: Box<FetchFn<T>>,
}

impl<T: Send + 'static> FnFetcher<T> {
    /// Wrap `f`; it receives an owned copy of the filters
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(u32, u32, Option<Filters>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PaginationResponse<T>>> + Send + 'static,
    {
        Self {
            f: Box::new(move |page, limit, filters| f(page, limit, filters).boxed()),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> PageFetcher<T> for FnFetcher<T> {
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&Filters>,
    ) -> Result<PaginationResponse<T>> {
        (self.f)(page, limit, filters.cloned()).await
    }
}

impl<T> std::fmt::Debug for FnFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

/// Shorthand for [`FnFetcher::new`]
pub fn fetch_fn<T, F, Fut>(f: F) -> FnFetcher<T>
where
    T: Send + 'static,
    F: Fn(u32, u32, Option<Filters>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PaginationResponse<T>>> + Send + 'static,
{
    FnFetcher::new(f)
}
