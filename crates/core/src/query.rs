//! Keyed query cache: freshness window, in-flight dedup, bounded retry,
//! per-key status and background refresh.
//!
//! Each fetch runs as a spawned task. Callers awaiting the same key share
//! it through [`futures::future::Shared`], so dropping one caller never
//! cancels the fetch for the others, and the task settles the cache itself.
//! The map mutex is never held across an `.await`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use coinboard_common::error::{CoinboardError, CoinboardResult};

use crate::retry::{retry_with_backoff, RetryConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Cached data younger than this is served without a request.
    pub stale_time: Duration,
    /// Background refresh period; `None` disables it.
    pub refetch_interval: Option<Duration>,
    pub retry: RetryConfig,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            refetch_interval: None,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one key. Data from the last success survives later errors.
#[derive(Debug, Clone)]
pub struct QueryState<V> {
    pub status: QueryStatus,
    pub data: Option<V>,
    pub error: Option<CoinboardError>,
    pub data_updated_at: Option<Instant>,
    /// Failed fetches since the key was created.
    pub error_count: u64,
    /// Bumped on every successful fetch.
    pub data_version: u64,
    pub is_fetching: bool,
}

impl<V> Default for QueryState<V> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            data_updated_at: None,
            error_count: 0,
            data_version: 0,
            is_fetching: false,
        }
    }
}

impl<V> QueryState<V> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, CoinboardResult<V>>>;

struct Entry<V> {
    state: QueryState<V>,
    in_flight: Option<SharedFetch<V>>,
    invalidated: bool,
}

impl<V> Entry<V> {
    fn new() -> Self {
        Self {
            state: QueryState::default(),
            in_flight: None,
            invalidated: false,
        }
    }
}

type Entries<K, V> = Arc<Mutex<HashMap<K, Entry<V>>>>;

pub struct QueryCache<K, V> {
    name: &'static str,
    options: QueryOptions,
    entries: Entries<K, V>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            options: self.options.clone(),
            entries: Arc::clone(&self.entries),
        }
    }
}

fn lock<K, V>(entries: &Entries<K, V>) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
    // A poisoned map only means a panic elsewhere mid-update; the entries stay usable.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, options: QueryOptions) -> Self {
        Self {
            name,
            options,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Return fresh cached data for `key`, or join/start a fetch.
    pub async fn fetch<F, Fut>(&self, key: K, fetcher: F) -> CoinboardResult<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoinboardResult<V>> + Send + 'static,
    {
        let shared = {
            let mut map = lock(&self.entries);
            let entry = map.entry(key.clone()).or_insert_with(Entry::new);

            if let Some(data) = self.fresh_data(entry) {
                debug!(query = self.name, ?key, "cache hit");
                return Ok(data);
            }

            match &entry.in_flight {
                Some(in_flight) => {
                    debug!(query = self.name, ?key, "joining in-flight fetch");
                    in_flight.clone()
                }
                None => {
                    debug!(query = self.name, ?key, "cache miss, fetching");
                    let shared = self.spawn_fetch(key, fetcher);
                    entry.state.is_fetching = true;
                    if entry.state.data.is_none() {
                        entry.state.status = QueryStatus::Loading;
                    }
                    entry.in_flight = Some(shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    /// Mark `key` stale and fetch it again.
    pub async fn refetch<F, Fut>(&self, key: K, fetcher: F) -> CoinboardResult<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoinboardResult<V>> + Send + 'static,
    {
        self.invalidate(&key);
        self.fetch(key, fetcher).await
    }

    /// The next fetch for `key` goes to the network. Cached data stays readable.
    pub fn invalidate(&self, key: &K) {
        if let Some(entry) = lock(&self.entries).get_mut(key) {
            entry.invalidated = true;
        }
    }

    pub fn invalidate_all(&self) {
        for entry in lock(&self.entries).values_mut() {
            entry.invalidated = true;
        }
    }

    pub fn state(&self, key: &K) -> QueryState<V> {
        lock(&self.entries)
            .get(key)
            .map(|e| e.state.clone())
            .unwrap_or_default()
    }

    pub fn data(&self, key: &K) -> Option<V> {
        lock(&self.entries).get(key).and_then(|e| e.state.data.clone())
    }

    /// Refetch `key` every `refetch_interval` until the handle is dropped.
    /// Returns `None` when the options disable background refresh.
    pub fn spawn_refresh<F, Fut>(&self, key: K, fetcher: F) -> Option<RefreshHandle>
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = CoinboardResult<V>> + Send + 'static,
    {
        let period = self.options.refetch_interval?;
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!(query = cache.name, ?key, "background refresh");
                if let Err(e) = cache.refetch(key.clone(), fetcher.clone()).await {
                    warn!("{} refresh for {key:?} failed: {e}", cache.name);
                }
            }
        });
        Some(RefreshHandle { handle })
    }

    fn fresh_data(&self, entry: &Entry<V>) -> Option<V> {
        if entry.invalidated {
            return None;
        }
        let updated = entry.state.data_updated_at?;
        if updated.elapsed() < self.options.stale_time {
            entry.state.data.clone()
        } else {
            None
        }
    }

    fn spawn_fetch<F, Fut>(&self, key: K, fetcher: F) -> SharedFetch<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoinboardResult<V>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let retry = self.options.retry.clone();
        let name = self.name;

        let task = tokio::spawn(async move {
            let result = retry_with_backoff(&retry, name, &fetcher).await;
            settle(&entries, &key, &result);
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(CoinboardError::Internal(format!("query task failed: {e}"))))
        }
        .boxed()
        .shared()
    }
}

fn settle<K: Eq + Hash, V: Clone>(entries: &Entries<K, V>, key: &K, result: &CoinboardResult<V>) {
    let mut map = lock(entries);
    let Some(entry) = map.get_mut(key) else {
        return;
    };
    entry.in_flight = None;
    entry.state.is_fetching = false;
    match result {
        Ok(value) => {
            entry.invalidated = false;
            entry.state.status = QueryStatus::Success;
            entry.state.data = Some(value.clone());
            entry.state.error = None;
            entry.state.data_updated_at = Some(Instant::now());
            entry.state.data_version += 1;
        }
        Err(e) => {
            entry.state.status = QueryStatus::Error;
            entry.state.error = Some(e.clone());
            entry.state.error_count += 1;
        }
    }
}

/// Aborts the background refresh task when dropped.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ─── Error reporting ────────────────────────────────────────────────

/// Reports each error occurrence of a key once, however often the state is read.
#[derive(Debug)]
pub struct ErrorNotifier<K> {
    reported: HashMap<K, u64>,
}

impl<K> Default for ErrorNotifier<K> {
    fn default() -> Self {
        Self {
            reported: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> ErrorNotifier<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state's error, if it has not been reported for this key yet.
    pub fn check<V>(&mut self, key: &K, state: &QueryState<V>) -> Option<CoinboardError> {
        let error = state.error.as_ref()?;
        let seen = self.reported.entry(key.clone()).or_insert(0);
        if state.error_count > *seen {
            *seen = state.error_count;
            Some(error.clone())
        } else {
            None
        }
    }
}

// ─── Late-response guard ────────────────────────────────────────────

/// Ticket issued for one request of a view slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic ticket counter for one view slot.
///
/// Issuing a new ticket supersedes every earlier one, so a response is
/// applied only while its ticket is still current.
#[derive(Debug, Clone, Default)]
pub struct RequestGuard {
    current: Arc<AtomicU64>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    /// Invalidate every outstanding ticket.
    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}
