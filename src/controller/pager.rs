//! The pagination controller
//!
//! `PaginationController` owns page, limit and filter state for one list
//! view. Data comes from three places, in order: the virtual page map sliced
//! from the initial payload, the shared query cache, and the page fetcher.
//! Every state change is published as a [`Snapshot`] on a watch channel.

use super::state::{Action, ControllerState, PaginationInfo, Snapshot};
use crate::cache::{create_query_key, MemoryCache, QueryCache, QueryKey};
use crate::compare::deep_equal_filters;
use crate::config::ControllerConfig;
use crate::debounce::{Debouncer, Scheduler, TokioScheduler};
use crate::error::{Error, Result};
use crate::fetch::{fetch_with_retry, PageFetcher};
use crate::filters::{has_active_filters, normalize_filters};
use crate::pagination::{PaginationResponse, VirtualPageMap, VirtualPageRequest};
use crate::types::Filters;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError, Weak};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type SharedCache<T> = Arc<dyn QueryCache<PaginationResponse<T>>>;

/// Address of one page under the current filters and limit
#[derive(Debug, Clone)]
struct PageRef {
    key: QueryKey,
    page: u32,
    limit: u32,
    filters: Option<Filters>,
}

/// Client-side pagination controller
///
/// Cheap to clone; clones drive the same state.
pub struct PaginationController<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for PaginationController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    base_key: QueryKey,
    fetcher: Arc<dyn PageFetcher<T>>,
    cache: SharedCache<T>,
    config: ControllerConfig,
    virtual_pages: Option<VirtualPageMap<T>>,
    state: Mutex<ControllerState<T>>,
    snapshots: watch::Sender<Snapshot<T>>,
    debouncer: Debouncer<Option<Filters>>,
    prefetching: SyncMutex<HashSet<QueryKey>>,
    gc: Option<JoinHandle<()>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(gc) = self.gc.take() {
            gc.abort();
        }
    }
}

impl<T> PaginationController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start building a controller for `base_key` backed by `fetcher`
    pub fn builder(
        base_key: QueryKey,
        fetcher: impl PageFetcher<T> + 'static,
    ) -> PaginationControllerBuilder<T> {
        PaginationControllerBuilder {
            base_key,
            fetcher: Arc::new(fetcher),
            initial_data: None,
            config: ControllerConfig::default(),
            cache: None,
            scheduler: None,
        }
    }

    /// Resolve the current page (first load)
    pub async fn load(&self) {
        self.inner.resolve_current(false).await;
    }

    /// Re-run the current query regardless of freshness
    pub async fn refetch(&self) {
        self.inner.resolve_current(true).await;
    }

    /// Navigate to `page`, clamped into `[1, total_pages]`.
    ///
    /// Returns once the visible page switched or the navigation failed; a
    /// failure leaves the page unchanged and is reported through `error()`.
    pub async fn go_to_page(&self, page: u32) {
        self.inner.go_to_page(page).await;
    }

    /// Navigate to the following page
    pub async fn next_page(&self) {
        let current = self.current_page();
        self.go_to_page(current.saturating_add(1)).await;
    }

    /// Navigate to the preceding page
    pub async fn previous_page(&self) {
        let current = self.current_page();
        self.go_to_page(current.saturating_sub(1)).await;
    }

    /// Supply new filters; the page resets immediately, the fetch waits for the debounce
    pub async fn set_filters(&self, filters: Option<Filters>) -> Result<bool> {
        let limit = self.inner.state.lock().await.observed_limit;
        self.update(filters, limit).await
    }

    /// Supply a new page size
    pub async fn set_limit(&self, limit: u32) -> Result<bool> {
        let filters = self.inner.state.lock().await.observed_filters.clone();
        self.update(filters, limit).await
    }

    /// Supply filters and limit together.
    ///
    /// Returns `false` when both deep-equal the last supplied values.
    pub async fn update(&self, filters: Option<Filters>, limit: u32) -> Result<bool> {
        if limit == 0 {
            return Err(Error::invalid_value("limit", "must be greater than zero"));
        }
        self.inner.update(filters, limit).await
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.snapshots.borrow().clone()
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.inner.snapshots.subscribe()
    }

    /// Items of the displayed page
    pub fn data(&self) -> Vec<T> {
        self.inner.snapshots.borrow().data().to_vec()
    }

    /// Displayed response
    pub fn response(&self) -> Option<Arc<PaginationResponse<T>>> {
        self.inner.snapshots.borrow().response.clone()
    }

    /// Total items, 0 when unknown
    pub fn total(&self) -> u64 {
        self.inner.snapshots.borrow().total()
    }

    /// Nothing displayed yet
    pub fn is_loading(&self) -> bool {
        self.inner.snapshots.borrow().is_loading
    }

    /// Fetch in flight or navigation resolving
    pub fn is_fetching(&self) -> bool {
        self.inner.snapshots.borrow().is_fetching
    }

    /// Last foreground fetch failed
    pub fn is_error(&self) -> bool {
        self.inner.snapshots.borrow().is_error
    }

    /// Last foreground error
    pub fn error(&self) -> Option<Arc<Error>> {
        self.inner.snapshots.borrow().error.clone()
    }

    /// Pagination view
    pub fn pagination(&self) -> PaginationInfo {
        self.inner.snapshots.borrow().pagination
    }

    /// Visible page
    pub fn current_page(&self) -> u32 {
        self.pagination().current_page
    }

    /// Key of the visible page
    pub async fn query_key(&self) -> QueryKey {
        let state = self.inner.state.lock().await;
        self.inner.locate(&state, state.page).key
    }

    /// Committed filters
    pub async fn filters(&self) -> Option<Filters> {
        self.inner.state.lock().await.filters.clone()
    }

    /// Base key every page key starts with
    pub fn base_key(&self) -> &QueryKey {
        &self.inner.base_key
    }

    /// Virtual pages built from the initial payload, if any
    pub fn virtual_pages(&self) -> Option<&VirtualPageMap<T>> {
        self.inner.virtual_pages.as_ref()
    }

    /// Shared cache
    pub fn cache(&self) -> SharedCache<T> {
        Arc::clone(&self.inner.cache)
    }

    /// Effective configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }
}

impl<T> std::fmt::Debug for PaginationController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationController")
            .field("base_key", &self.inner.base_key)
            .field("config", &self.inner.config)
            .field("has_virtual_pages", &self.inner.virtual_pages.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn publish(&self, state: &ControllerState<T>) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn locate(&self, state: &ControllerState<T>, page: u32) -> PageRef {
        PageRef {
            key: create_query_key(&self.base_key, page, state.limit, state.filters.as_ref()),
            page,
            limit: state.limit,
            filters: state.filters.clone(),
        }
    }

    fn virtual_page(
        &self,
        state: &ControllerState<T>,
        page: u32,
    ) -> Option<Arc<PaginationResponse<T>>> {
        let map = self.virtual_pages.as_ref()?;
        if !state.virtual_active || state.filters.is_some() || map.limit() != state.limit {
            return None;
        }
        map.get(page)
    }

    /// Bring the displayed response in line with the current key
    async fn resolve_current(self: &Arc<Self>, force: bool) {
        let (target, candidate) = {
            let state = self.state.lock().await;
            (self.locate(&state, state.page), self.virtual_page(&state, state.page))
        };

        if !force {
            match self.cache.get(&target.key).await {
                Some(entry) if !entry.is_stale() => {
                    debug!("Cache hit for {}", target.key);
                    self.commit(&target.key, entry.value).await;
                    self.maybe_prefetch().await;
                    return;
                }
                Some(entry) => {
                    debug!("Serving stale {} while refetching", target.key);
                    self.commit(&target.key, entry.value).await;
                    let this = Arc::clone(self);
                    tokio::spawn(async move { this.refresh(target, candidate).await });
                    return;
                }
                None => {
                    if let Some(page) = candidate {
                        debug!("Seeding {} from virtual page", target.key);
                        self.cache
                            .set(target.key.clone(), Arc::clone(&page), self.config.cache_options())
                            .await;
                        self.commit(&target.key, page).await;
                        self.maybe_prefetch().await;
                        return;
                    }
                }
            }
        }

        self.refresh(target, candidate).await;
    }

    /// Run the query for `target`, store the result, and display it if still current
    async fn refresh(
        self: &Arc<Self>,
        target: PageRef,
        candidate: Option<Arc<PaginationResponse<T>>>,
    ) {
        {
            let mut state = self.state.lock().await;
            state.apply(Action::FetchStarted);
            self.publish(&state);
        }

        let result = self.run_query(&target, candidate).await;

        {
            let mut state = self.state.lock().await;
            state.apply(Action::FetchSettled);
            self.publish(&state);
        }

        match result {
            Ok(page) => {
                self.cache
                    .set(target.key.clone(), Arc::clone(&page), self.config.cache_options())
                    .await;
                self.commit(&target.key, page).await;
            }
            Err(e) => {
                warn!("Loading {} failed: {}", target.key, e);
                let mut state = self.state.lock().await;
                if self.locate(&state, state.page).key == target.key {
                    state.apply(Action::Failed { error: Arc::new(e) });
                    self.publish(&state);
                }
            }
        }

        self.maybe_prefetch().await;
    }

    /// The query function: a trusted virtual page, else the fetcher with retries
    async fn run_query(
        &self,
        target: &PageRef,
        candidate: Option<Arc<PaginationResponse<T>>>,
    ) -> Result<Arc<PaginationResponse<T>>> {
        if let Some(page) = candidate {
            let invalidated = self
                .cache
                .get(&target.key)
                .await
                .is_some_and(|entry| entry.invalidated);
            if !invalidated {
                return Ok(page);
            }
        }

        fetch_with_retry(
            self.fetcher.as_ref(),
            &self.config.retry,
            target.page,
            target.limit,
            target.filters.as_ref(),
        )
        .await
        .map(Arc::new)
    }

    /// Display `page` if `key` is still the current key
    async fn commit(&self, key: &QueryKey, page: Arc<PaginationResponse<T>>) {
        let mut state = self.state.lock().await;
        if self.locate(&state, state.page).key == *key {
            state.apply(Action::Loaded {
                response: page,
                at: Utc::now(),
            });
            self.publish(&state);
        }
    }

    async fn go_to_page(self: &Arc<Self>, requested: u32) {
        let (target, candidate) = {
            let mut state = self.state.lock().await;
            let page = requested.clamp(1, state.pagination().total_pages);
            if page == state.page {
                return;
            }
            state.apply(Action::NavigationStarted);
            self.publish(&state);
            (self.locate(&state, page), self.virtual_page(&state, page))
        };

        let available = match candidate {
            Some(page) => {
                debug!("Page {} served from virtual pages", target.page);
                Some(page)
            }
            None => self.cache.get(&target.key).await.map(|entry| entry.value),
        };

        let response = match available {
            Some(response) => response,
            None => {
                let fetched = fetch_with_retry(
                    self.fetcher.as_ref(),
                    &self.config.retry,
                    target.page,
                    target.limit,
                    target.filters.as_ref(),
                )
                .await;
                match fetched {
                    Ok(response) => {
                        let response = Arc::new(response);
                        self.cache
                            .set(
                                target.key.clone(),
                                Arc::clone(&response),
                                self.config.cache_options(),
                            )
                            .await;
                        response
                    }
                    Err(e) => {
                        warn!("Navigation to page {} failed: {}", target.page, e);
                        let mut state = self.state.lock().await;
                        state.apply(Action::NavigationFailed { error: Arc::new(e) });
                        self.publish(&state);
                        return;
                    }
                }
            }
        };

        {
            let mut state = self.state.lock().await;
            if self.locate(&state, target.page).key == target.key {
                state.apply(Action::NavigationSucceeded {
                    page: target.page,
                    response,
                });
            } else {
                debug!("Dropping navigation to page {}: filters changed", target.page);
                state.apply(Action::NavigationAbandoned);
            }
            self.publish(&state);
        }

        self.resolve_current(false).await;
    }

    async fn update(self: &Arc<Self>, filters: Option<Filters>, limit: u32) -> Result<bool> {
        let filters = normalize_filters(filters.as_ref());
        let same_committed = {
            let mut state = self.state.lock().await;
            if !state.is_reconfiguration(filters.as_ref(), limit) {
                return Ok(false);
            }
            state.apply(Action::Reconfigured {
                filters: filters.clone(),
                limit,
            });
            self.publish(&state);
            deep_equal_filters(filters.as_ref(), state.filters.as_ref())
        };

        let invalidated = self.cache.invalidate_prefix(&self.base_key).await;
        debug!("Invalidated {} entries under {}", invalidated, self.base_key);

        self.debouncer.call(filters);

        // Filters are already in effect, so the new limit can load right away
        if same_committed {
            self.resolve_current(false).await;
        }
        Ok(true)
    }

    async fn commit_filters(self: &Arc<Self>, filters: Option<Filters>) {
        {
            let mut state = self.state.lock().await;
            state.apply(Action::FiltersCommitted { filters });
            self.publish(&state);
        }
        self.resolve_current(false).await;
    }

    /// Fetch the following page into the cache if nothing is in flight
    async fn maybe_prefetch(self: &Arc<Self>) {
        if !self.config.prefetch {
            return;
        }

        let (next, in_virtual) = {
            let state = self.state.lock().await;
            if state.fetching > 0 || state.is_changing_page || !state.pagination().has_next_page {
                return;
            }
            let next = self.locate(&state, state.page + 1);
            let in_virtual = self.virtual_page(&state, next.page).is_some();
            (next, in_virtual)
        };

        if in_virtual || self.cache.contains(&next.key).await {
            return;
        }
        if !self.lock_prefetching().insert(next.key.clone()) {
            return;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this
                .fetcher
                .fetch_page(next.page, next.limit, next.filters.as_ref())
                .await
            {
                Ok(page) => {
                    debug!("Prefetched {}", next.key);
                    this.cache
                        .set(next.key.clone(), Arc::new(page), this.config.cache_options())
                        .await;
                }
                Err(e) => debug!("Prefetch of {} failed: {}", next.key, e),
            }
            this.lock_prefetching().remove(&next.key);
        });
    }

    fn lock_prefetching(&self) -> std::sync::MutexGuard<'_, HashSet<QueryKey>> {
        self.prefetching.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for [`PaginationController`]
pub struct PaginationControllerBuilder<T> {
    base_key: QueryKey,
    fetcher: Arc<dyn PageFetcher<T>>,
    initial_data: Option<PaginationResponse<T>>,
    config: ControllerConfig,
    cache: Option<SharedCache<T>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl<T> PaginationControllerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Payload already in hand, used to synthesize virtual pages
    #[must_use]
    pub fn initial_data(mut self, data: PaginationResponse<T>) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a cache with other controllers
    #[must_use]
    pub fn cache(mut self, cache: SharedCache<T>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Timer used for the filter debounce
    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Build the controller; fails on an invalid configuration
    pub fn build(self) -> Result<PaginationController<T>> {
        self.config.validate()?;

        let filters = normalize_filters(self.config.filters.as_ref());
        let virtual_pages = VirtualPageMap::build(&VirtualPageRequest {
            enabled: self.config.enable_virtual_pages,
            initial: self.initial_data.as_ref(),
            first_mount: true,
            limit: self.config.limit,
            filters_active: has_active_filters(filters.as_ref()),
        });
        if let Some(map) = &virtual_pages {
            debug!("Built {} virtual pages for {}", map.len(), self.base_key);
        }

        let state = ControllerState::new(self.config.limit, filters, virtual_pages.is_some());
        let (snapshots, _) = watch::channel(state.snapshot());
        // An owned cache sweeps itself; a shared one belongs to the caller
        let (cache, gc) = match self.cache {
            Some(cache) => (cache, None),
            None => {
                let cache = MemoryCache::<PaginationResponse<T>>::new();
                let gc = tokio::runtime::Handle::try_current()
                    .ok()
                    .map(|_| cache.spawn_gc(self.config.cache_time()));
                (Arc::new(cache) as SharedCache<T>, gc)
            }
        };
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler) as Arc<dyn Scheduler>);
        let delay = self.config.debounce_delay();

        let inner = Arc::new_cyclic(|weak: &Weak<Inner<T>>| {
            let weak = weak.clone();
            let debouncer = Debouncer::with_scheduler(
                move |filters: Option<Filters>| {
                    if let Some(inner) = weak.upgrade() {
                        tokio::spawn(async move { inner.commit_filters(filters).await });
                    }
                },
                delay,
                scheduler,
            );
            Inner {
                base_key: self.base_key,
                fetcher: self.fetcher,
                cache,
                config: self.config,
                virtual_pages,
                state: Mutex::new(state),
                snapshots,
                debouncer,
                prefetching: SyncMutex::new(HashSet::new()),
                gc,
            }
        });

        Ok(PaginationController { inner })
    }
}

impl<T> std::fmt::Debug for PaginationControllerBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationControllerBuilder")
            .field("base_key", &self.base_key)
            .field("config", &self.config)
            .field("has_initial_data", &self.initial_data.is_some())
            .finish_non_exhaustive()
    }
}
