//! Usage store implementations.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;

use super::UsageStore;

/// Usage counts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    counts: Mutex<BTreeMap<String, u64>>,
    failing: AtomicBool,
    ready_calls: AtomicUsize,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a period count directly, bypassing the failure switch.
    pub fn insert(&self, period: &str, count: u64) {
        self.lock().insert(period.to_string(), count);
    }

    pub fn count(&self, period: &str) -> Option<u64> {
        self.lock().get(period).copied()
    }

    pub fn counts(&self) -> BTreeMap<String, u64> {
        self.lock().clone()
    }

    /// Make every store call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `ensure_ready` calls seen.
    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, u64>> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("usage store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    async fn period_count(&self, period: &str) -> Result<Option<u64>, StoreError> {
        self.check()?;
        Ok(self.count(period))
    }

    async fn set_period_count(&self, period: &str, count: u64) -> Result<(), StoreError> {
        self.check()?;
        self.insert(period, count);
        Ok(())
    }
}

/// Usage counts in a JSON file mapping period keys to counts.
///
/// ```json
/// { "202601": 12, "202602": 3 }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileUsageStore {
    path: PathBuf,
}

impl JsonFileUsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored period, oldest first.
    pub async fn load(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, counts: &BTreeMap<String, u64>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(counts)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;

        // Replace the file in one step so readers never see a partial write.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl UsageStore for JsonFileUsageStore {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }

        debug!(path = %self.path.display(), "Creating usage ledger file");
        self.save(&BTreeMap::new()).await
    }

    async fn period_count(&self, period: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.load().await?.get(period).copied())
    }

    async fn set_period_count(&self, period: &str, count: u64) -> Result<(), StoreError> {
        let mut counts = self.load().await?;
        counts.insert(period.to_string(), count);
        self.save(&counts).await
    }
}
