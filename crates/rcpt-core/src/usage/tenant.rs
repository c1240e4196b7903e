//! Per-tenant quotas.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::StoreError;

use super::{Availability, DEFAULT_STORE_TIMEOUT, bounded};

/// One row of the tenant directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub tenant_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub monthly_quota: u64,
    #[serde(default)]
    pub used: u64,
}

impl TenantRecord {
    pub fn new(tenant_id: impl Into<String>, monthly_quota: u64) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            display_name: None,
            monthly_quota,
            used: 0,
        }
    }
}

/// Table of tenants and their standing quotas.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>, StoreError>;

    async fn set_used(&self, tenant_id: &str, used: u64) -> Result<(), StoreError>;
}

/// Tenant directory kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryTenantDirectory {
    tenants: Mutex<BTreeMap<String, TenantRecord>>,
    failing: AtomicBool,
}

impl MemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: TenantRecord) {
        self.tenants
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.tenant_id.clone(), record);
    }

    pub fn tenant(&self, tenant_id: &str) -> Option<TenantRecord> {
        self.tenants
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(tenant_id)
            .cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("tenant directory offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantRecord>, StoreError> {
        self.check()?;
        Ok(self.tenant(tenant_id))
    }

    async fn set_used(&self, tenant_id: &str, used: u64) -> Result<(), StoreError> {
        self.check()?;
        let mut tenants = self.tenants.lock().unwrap_or_else(|e| e.into_inner());
        match tenants.get_mut(tenant_id) {
            Some(record) => {
                record.used = used;
                Ok(())
            }
            None => Err(StoreError::Rejected(format!("unknown tenant {}", tenant_id))),
        }
    }
}

/// Quota gate over a [`TenantDirectory`].
///
/// Reads always go to the directory. The last count seen per tenant is kept
/// only as the fail-open fallback when the directory cannot be read. Quotas
/// are standing allotments reset by an administrator, not by the calendar.
pub struct TenantLedger {
    directory: Arc<dyn TenantDirectory>,
    default_quota: u64,
    store_timeout: Duration,
    last_seen: Mutex<HashMap<String, u64>>,
}

impl TenantLedger {
    pub fn new(directory: Arc<dyn TenantDirectory>, default_quota: u64) -> Self {
        Self {
            directory,
            default_quota,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Longest a single directory call may take before it counts as a failure.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Whether the tenant may process another document.
    ///
    /// Unknown tenants are refused. A directory failure answers with the
    /// default quota as the limit.
    pub async fn check_availability(&self, tenant_id: &str) -> Availability {
        match bounded(self.store_timeout, self.directory.get_tenant(tenant_id)).await {
            Ok(Some(record)) => {
                self.remember(tenant_id, record.used);
                Availability::new(record.used, record.monthly_quota, false)
            }
            Ok(None) => {
                warn!(tenant = %tenant_id, "Quota check for unknown tenant");
                Availability::unknown_tenant(tenant_id)
            }
            Err(err) => {
                let used = self.last_seen(tenant_id).unwrap_or(0);
                warn!(tenant = %tenant_id, error = %err, used, "Tenant directory read failed, failing open");
                Availability::new(used, self.default_quota, true)
            }
        }
    }

    /// Record one successful extraction for the tenant and return the new count.
    pub async fn increment(&self, tenant_id: &str) -> u64 {
        let current = match bounded(self.store_timeout, self.directory.get_tenant(tenant_id)).await {
            Ok(Some(record)) => record.used,
            Ok(None) => {
                warn!(tenant = %tenant_id, "Usage increment for unknown tenant ignored");
                return 0;
            }
            Err(err) => {
                let cached = self.last_seen(tenant_id).unwrap_or(0);
                warn!(tenant = %tenant_id, error = %err, cached, "Tenant directory read failed before increment");
                cached
            }
        };

        let next = current + 1;
        match bounded(self.store_timeout, self.directory.set_used(tenant_id, next)).await {
            Ok(()) => info!(tenant = %tenant_id, used = next, "Tenant usage incremented"),
            Err(err) => error!(
                tenant = %tenant_id,
                used = next,
                error = %err,
                "Tenant usage write failed, directory is understated"
            ),
        }

        self.remember(tenant_id, next);
        next
    }

    fn last_seen(&self, tenant_id: &str) -> Option<u64> {
        self.last_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(tenant_id)
            .copied()
    }

    fn remember(&self, tenant_id: &str, used: u64) {
        self.last_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tenant_id.to_string(), used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directory() -> Arc<MemoryTenantDirectory> {
        let directory = Arc::new(MemoryTenantDirectory::new());
        directory.insert(TenantRecord {
            tenant_id: "spa-01".to_string(),
            display_name: Some("Siam Spa".to_string()),
            monthly_quota: 2,
            used: 0,
        });
        directory
    }

    #[tokio::test]
    async fn test_tenant_quota() {
        let directory = directory();
        let ledger = TenantLedger::new(directory.clone(), 100);

        assert!(ledger.check_availability("spa-01").await.allowed);
        assert_eq!(ledger.increment("spa-01").await, 1);
        assert_eq!(ledger.increment("spa-01").await, 2);

        let availability = ledger.check_availability("spa-01").await;
        assert!(!availability.allowed);
        assert_eq!(availability.limit, 2);
        assert_eq!(directory.tenant("spa-01").unwrap().used, 2);
    }

    #[tokio::test]
    async fn test_reads_are_fresh() {
        let directory = directory();
        let ledger = TenantLedger::new(directory.clone(), 100);
        assert_eq!(ledger.check_availability("spa-01").await.used, 0);

        let mut record = directory.tenant("spa-01").unwrap();
        record.used = 2;
        directory.insert(record);

        assert!(!ledger.check_availability("spa-01").await.allowed);
    }

    #[tokio::test]
    async fn test_unknown_tenant_refused() {
        let ledger = TenantLedger::new(directory(), 100);
        let availability = ledger.check_availability("nobody").await;

        assert!(!availability.allowed);
        assert!(availability.message.unwrap().contains("nobody"));
        assert_eq!(ledger.increment("nobody").await, 0);
    }

    #[tokio::test]
    async fn test_directory_failure_fails_open() {
        let directory = directory();
        let ledger = TenantLedger::new(directory.clone(), 100);
        ledger.increment("spa-01").await;

        directory.set_failing(true);
        let availability = ledger.check_availability("spa-01").await;
        assert!(availability.allowed);
        assert_eq!(availability.used, 1);
        assert_eq!(availability.limit, 100);

        assert_eq!(ledger.increment("spa-01").await, 2);
        directory.set_failing(false);
        assert_eq!(directory.tenant("spa-01").unwrap().used, 1);
    }

    struct HangingDirectory;

    #[async_trait]
    impl TenantDirectory for HangingDirectory {
        async fn get_tenant(&self, _tenant_id: &str) -> Result<Option<TenantRecord>, StoreError> {
            std::future::pending().await
        }

        async fn set_used(&self, _tenant_id: &str, _used: u64) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_directory_times_out_and_fails_open() {
        let ledger = TenantLedger::new(Arc::new(HangingDirectory), 100)
            .with_store_timeout(Duration::from_millis(200));

        let availability = ledger.check_availability("spa-01").await;
        assert!(availability.allowed);
        assert_eq!(availability.limit, 100);

        assert_eq!(ledger.increment("spa-01").await, 1);
        assert_eq!(ledger.check_availability("spa-01").await.used, 1);
    }
}
