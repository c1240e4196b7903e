//! Monthly usage ledger with a short-lived count cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::models::config::UsageConfig;

use super::{Availability, Clock, DEFAULT_STORE_TIMEOUT, UsageStore, bounded, period_key};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedCount {
    period: String,
    count: u64,
    updated_at: NaiveDateTime,
}

/// Counts successful extractions per calendar month.
///
/// The current period is computed from the injected clock on every call, so
/// a month rollover simply misses the cache and starts from the new period's
/// record. Old periods are never touched.
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    limit: u64,
    cache_ttl: Duration,
    store_timeout: Duration,
    cache: Mutex<Option<CachedCount>>,
    ready: AtomicBool,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>, limit: u64) -> Self {
        Self {
            store,
            clock,
            limit,
            cache_ttl: DEFAULT_CACHE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            cache: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(
        store: Arc<dyn UsageStore>,
        clock: Arc<dyn Clock>,
        config: &UsageConfig,
    ) -> Self {
        Self::new(store, clock, config.monthly_limit)
            .with_cache_ttl(Duration::from_secs(config.cache_ttl_secs))
            .with_store_timeout(Duration::from_millis(config.store_timeout_ms))
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Longest a single store call may take before it counts as a failure.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Period key the ledger is counting against right now.
    pub fn current_period(&self) -> String {
        period_key(self.clock.now())
    }

    /// Whether another document may be processed this month.
    ///
    /// Never fails: a store read error answers with the cached count for the
    /// current period, or 0.
    pub async fn check_availability(&self) -> Availability {
        self.ensure_ready().await;

        let now = self.clock.now();
        let period = period_key(now);

        if let Some(count) = self.fresh_cached(&period, now) {
            debug!(period = %period, count, "Usage served from cache");
            return Availability::new(count, self.limit, false);
        }

        match bounded(self.store_timeout, self.store.period_count(&period)).await {
            Ok(stored) => {
                let count = stored.unwrap_or(0);
                self.remember(&period, count, now);
                Availability::new(count, self.limit, false)
            }
            Err(err) => {
                let count = self.cached_for(&period).unwrap_or(0);
                warn!(period = %period, error = %err, count, "Usage store read failed, failing open");
                Availability::new(count, self.limit, true)
            }
        }
    }

    /// Record one successful extraction and return the new count.
    ///
    /// A failed write still advances the cached count; the persisted ledger
    /// is then understated and the failure is logged at error level.
    pub async fn increment(&self) -> u64 {
        self.ensure_ready().await;

        let now = self.clock.now();
        let period = period_key(now);

        let current = match bounded(self.store_timeout, self.store.period_count(&period)).await {
            Ok(stored) => stored.unwrap_or(0),
            Err(err) => {
                let cached = self.cached_for(&period).unwrap_or(0);
                warn!(period = %period, error = %err, cached, "Usage store read failed before increment");
                cached
            }
        };

        let next = current + 1;
        match bounded(self.store_timeout, self.store.set_period_count(&period, next)).await {
            Ok(()) => info!(period = %period, count = next, "Usage incremented"),
            Err(err) => error!(
                period = %period,
                count = next,
                error = %err,
                "Usage write failed, persisted ledger is understated"
            ),
        }

        self.remember(&period, next, now);
        next
    }

    /// Stored count for any period, bypassing the cache.
    pub async fn usage_for(&self, period: &str) -> Result<u64, StoreError> {
        Ok(bounded(self.store_timeout, self.store.period_count(period))
            .await?
            .unwrap_or(0))
    }

    async fn ensure_ready(&self) {
        if self.ready.load(Ordering::Acquire) {
            return;
        }

        match bounded(self.store_timeout, self.store.ensure_ready()).await {
            Ok(()) => self.ready.store(true, Ordering::Release),
            Err(err) => warn!(error = %err, "Usage store initialization failed, retrying on next call"),
        }
    }

    fn fresh_cached(&self, period: &str, now: NaiveDateTime) -> Option<u64> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let cached = cache.as_ref().filter(|c| c.period == period)?;

        // A clock that moved backwards leaves the entry fresh.
        let fresh = match (now - cached.updated_at).to_std() {
            Ok(elapsed) => elapsed < self.cache_ttl,
            Err(_) => true,
        };
        fresh.then_some(cached.count)
    }

    fn cached_for(&self, period: &str) -> Option<u64> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.as_ref().filter(|c| c.period == period).map(|c| c.count)
    }

    fn remember(&self, period: &str, count: u64, now: NaiveDateTime) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(CachedCount {
            period: period.to_string(),
            count,
            updated_at: now,
        });
    }
}
