//! Single-flight credential cache
//!
//! [`CachedProvider`] serves a valid cached value without calling its
//! source. When the value is missing or inside the refresh margin, exactly
//! one resolution runs and every caller that arrives meanwhile waits for
//! its outcome. A failed refresh is reported to all of them and the stale
//! value is discarded.
//!
//! The resolution runs on a spawned task, so a caller that gives up (for
//! example through a timeout) does not cancel it for the others. A Tokio
//! runtime is therefore required.

mod config;

pub use config::CacheConfig;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::core::{Clock, Credentials, ResolveContext, ResolveError, SystemClock, to_time_delta};
use crate::provider::{ProvideCredentials, SharedProvider};

type Outcome = Result<Credentials, Arc<ResolveError>>;

#[derive(Debug)]
struct CacheEntry {
    credentials: Credentials,
    /// `None` means the entry never goes stale
    valid_until: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(credentials: Credentials, now: DateTime<Utc>, config: &CacheConfig) -> Self {
        let expiry = credentials.expiration().or_else(|| {
            config
                .default_ttl
                .and_then(|ttl| now.checked_add_signed(to_time_delta(ttl)))
        });
        let valid_until = expiry.map(|expiry| {
            expiry
                .checked_sub_signed(to_time_delta(config.refresh_margin))
                .unwrap_or(expiry)
        });
        Self {
            credentials,
            valid_until,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_none_or(|until| now < until)
    }
}

#[derive(Debug)]
enum Slot {
    Empty,
    Valid(CacheEntry),
    Refreshing(Vec<oneshot::Sender<Outcome>>),
    Closed,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the cached value
    pub hits: u64,
    /// Calls that had to wait for a resolution
    pub misses: u64,
    /// Resolutions started
    pub refreshes: u64,
    /// Resolutions that failed
    pub failures: u64,
}

impl CacheStats {
    /// Ratio of hits to total calls (0.0 to 1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug)]
struct Shared {
    source: SharedProvider,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot>,
    counters: Counters,
}

enum Lookup {
    Hit(Credentials),
    Wait(oneshot::Receiver<Outcome>),
}

/// Caching, coalescing wrapper around another provider
///
/// Cloning is cheap; clones share the cache.
#[derive(Debug, Clone)]
pub struct CachedProvider {
    shared: Arc<Shared>,
}

impl CachedProvider {
    /// Cache `source` with the default configuration
    pub fn new(source: impl ProvideCredentials + 'static) -> Self {
        Self::builder(source).build()
    }

    pub fn builder(source: impl ProvideCredentials + 'static) -> CachedProviderBuilder {
        CachedProviderBuilder {
            source: Arc::new(source),
            config: CacheConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Drop the cached value; the next call resolves again
    pub fn invalidate(&self) {
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Valid(_)) {
            *slot = Slot::Empty;
        }
    }

    /// Stop serving credentials
    ///
    /// Callers waiting on an in-flight resolution receive
    /// [`ResolveError::Closed`]; later calls fail the same way.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.shared.slot.lock(), Slot::Closed);
        if let Slot::Refreshing(waiters) = previous {
            let closed: Outcome = Err(Arc::new(ResolveError::Closed));
            for waiter in waiters {
                let _ = waiter.send(closed.clone());
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Closed)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.shared.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            refreshes: counters.refreshes.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, ctx: &ResolveContext) -> Result<Lookup, ResolveError> {
        let now = self.shared.clock.now();
        let counters = &self.shared.counters;
        let mut slot = self.shared.slot.lock();

        match &mut *slot {
            Slot::Closed => return Err(ResolveError::Closed),
            Slot::Valid(entry) if entry.is_fresh(now) => {
                counters.hits.fetch_add(1, Ordering::Relaxed);
                trace!(source = self.shared.source.name(), "Credentials cache hit");
                return Ok(Lookup::Hit(entry.credentials.clone()));
            }
            Slot::Refreshing(waiters) => {
                counters.misses.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                return Ok(Lookup::Wait(rx));
            }
            Slot::Valid(_) | Slot::Empty => {}
        }

        counters.misses.fetch_add(1, Ordering::Relaxed);
        counters.refreshes.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        *slot = Slot::Refreshing(vec![tx]);
        drop(slot);

        self.spawn_refresh(ctx.clone());
        Ok(Lookup::Wait(rx))
    }

    fn spawn_refresh(&self, ctx: ResolveContext) {
        let shared = Arc::clone(&self.shared);
        let span = debug_span!(
            "credentials_refresh",
            trace_id = %ctx.trace_id,
            source = shared.source.name(),
        );

        tokio::spawn(
            async move {
                // Unblocks waiters if this task panics or is dropped mid-resolution
                let guard = scopeguard::guard(shared, |shared| shared.abandon());
                let outcome = guard.source.resolve(&ctx).await;
                let shared = ScopeGuard::into_inner(guard);
                shared.complete(outcome);
            }
            .instrument(span),
        );
    }
}

impl Shared {
    fn complete(&self, outcome: Result<Credentials, ResolveError>) {
        let now = self.clock.now();
        let outcome: Outcome = outcome.map_err(Arc::new);

        let waiters = {
            let mut slot = self.slot.lock();
            let Slot::Refreshing(waiters) = &mut *slot else {
                // Closed while resolving; waiters were already told
                return;
            };
            let waiters = std::mem::take(waiters);
            *slot = match &outcome {
                Ok(credentials) => Slot::Valid(CacheEntry::new(credentials.clone(), now, &self.config)),
                Err(_) => Slot::Empty,
            };
            waiters
        };

        match &outcome {
            Ok(credentials) => debug!(
                source = self.source.name(),
                waiters = waiters.len(),
                expiration = ?credentials.expiration(),
                "Credentials refreshed"
            ),
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    source = self.source.name(),
                    waiters = waiters.len(),
                    %error,
                    "Credentials refresh failed"
                );
            }
        }

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Refreshing(_)) {
            // Dropping the senders wakes every waiter with an error
            *slot = Slot::Empty;
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!(source = self.source.name(), "Credentials refresh abandoned");
        }
    }
}

#[async_trait]
impl ProvideCredentials for CachedProvider {
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Credentials, ResolveError> {
        let receiver = match self.lookup(ctx)? {
            Lookup::Hit(credentials) => return Ok(credentials),
            Lookup::Wait(receiver) => receiver,
        };

        match receiver.await {
            Ok(Ok(credentials)) => Ok(credentials),
            Ok(Err(error)) if matches!(*error, ResolveError::Closed) => Err(ResolveError::Closed),
            Ok(Err(error)) => Err(ResolveError::RefreshFailed { source: error }),
            Err(_) => Err(ResolveError::RefreshFailed {
                source: Arc::new(ResolveError::source_failure(
                    self.shared.source.name().to_string(),
                    "credentials resolution ended without a result",
                )),
            }),
        }
    }

    fn name(&self) -> &str {
        self.shared.source.name()
    }
}

/// Builder for [`CachedProvider`]
#[derive(Debug)]
pub struct CachedProviderBuilder {
    source: SharedProvider,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl CachedProviderBuilder {
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> CachedProvider {
        CachedProvider {
            shared: Arc::new(Shared {
                source: self.source,
                config: self.config,
                clock: self.clock,
                slot: Mutex::new(Slot::Empty),
                counters: Counters::default(),
            }),
        }
    }
}
