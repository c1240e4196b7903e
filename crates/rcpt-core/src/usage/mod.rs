//! Extraction quota accounting.
//!
//! [`UsageLedger`] counts successful extractions per calendar month and gates
//! new documents once the configured limit is reached. [`TenantLedger`] does
//! the same against a per-tenant directory with standing quotas.
//!
//! Both ledgers fail open: when the backing store cannot be read they answer
//! from what they last saw rather than blocking the user flow. Their
//! read-then-write increment is not atomic, so concurrent documents can
//! under-count by the number of documents in flight.
//!
//! Every store call is bounded by a timeout; a call that does not answer in
//! time is treated as [`StoreError::Unavailable`].

mod ledger;
mod store;
mod tenant;

pub use ledger::UsageLedger;
pub use store::{JsonFileUsageStore, MemoryUsageStore};
pub use tenant::{MemoryTenantDirectory, TenantDirectory, TenantLedger, TenantRecord};

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::error::StoreError;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The process's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bound on a single store call unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a store call, turning a timeout into [`StoreError::Unavailable`].
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Unavailable(format!(
            "no answer within {} ms",
            limit.as_millis()
        ))),
    }
}

/// `YYYYMM` period key for a timestamp.
pub fn period_key(at: NaiveDateTime) -> String {
    at.format("%Y%m").to_string()
}

/// Persistent per-month extraction counts.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Prepare the backing storage (create the usage table, file, ...).
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Stored count for a period, `None` when the period has no record yet.
    async fn period_count(&self, period: &str) -> Result<Option<u64>, StoreError>;

    /// Create or overwrite the record for a period.
    async fn set_period_count(&self, period: &str, count: u64) -> Result<(), StoreError>;
}

/// Answer of a quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub allowed: bool,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub message: Option<String>,
}

impl Availability {
    /// Gate for `used` against `limit`. `degraded` marks an answer served
    /// without a successful store read.
    pub fn new(used: u64, limit: u64, degraded: bool) -> Self {
        let allowed = used < limit;
        let message = if !allowed {
            Some(format!(
                "Monthly quota reached ({}/{}). Processing resumes next month.",
                used, limit
            ))
        } else if degraded {
            Some("Usage store unavailable, showing the last known count.".to_string())
        } else {
            None
        };

        Self {
            allowed,
            used,
            limit,
            remaining: limit.saturating_sub(used),
            message,
        }
    }

    /// Gate for a tenant the directory does not know.
    pub fn unknown_tenant(tenant_id: &str) -> Self {
        Self {
            allowed: false,
            used: 0,
            limit: 0,
            remaining: 0,
            message: Some(format!("Tenant {} is not registered.", tenant_id)),
        }
    }
}
