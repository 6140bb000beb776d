//! Polling updater keeping watched pools fresh in the shared registry.

use stable_lp_domain::config::ChainConfig;
use stable_lp_domain::error::DomainError;
use stable_lp_domain::registry::Registry;
use stable_lp_protocols::{PoolQuery, QueryError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Registry handle shared between the updater (writer) and estimators (readers).
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Wraps a registry for sharing.
pub fn shared(registry: Registry) -> SharedRegistry {
    Arc::new(RwLock::new(registry))
}

/// Why a pool could not be refreshed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("read failed: {0}")]
    Query(#[from] QueryError),
    #[error("snapshot rejected: {0}")]
    Registry(#[from] DomainError),
}

/// Synchronization status of a watched pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Never read successfully.
    Pending,
    /// Last read succeeded.
    InSync,
    /// Last reads failed; the registry keeps the last known state.
    Stale,
    /// `max_failures` consecutive reads failed.
    Failed,
}

/// Tracking state for a watched pool.
#[derive(Debug, Clone)]
pub struct PoolSyncState {
    pub pool_id: String,
    pub address: String,
    pub status: SyncStatus,
    pub last_update: Option<Instant>,
    /// Consecutive failed reads.
    pub failure_count: u32,
}

/// Configuration for the updater.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Time between polling rounds.
    pub refresh_interval: Duration,
    /// Consecutive failures before a pool is marked failed.
    pub max_failures: u32,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            max_failures: 3,
        }
    }
}

impl UpdaterConfig {
    pub fn from_chain(config: &ChainConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            ..Self::default()
        }
    }
}

/// Outcome of one polling round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshResult {
    /// Pools whose state was written to the registry.
    pub updated: u32,
    /// Pools whose read or write failed.
    pub failed: u32,
}

/// Polls `get_pool_state` for watched pools and writes the snapshots into
/// the shared registry.
///
/// Reads run without holding the registry lock; each snapshot is applied
/// under a short write lock.
pub struct PoolStateUpdater {
    query: Arc<dyn PoolQuery>,
    registry: SharedRegistry,
    config: UpdaterConfig,
    watched: Arc<RwLock<BTreeMap<String, PoolSyncState>>>,
    running: Arc<AtomicBool>,
}

impl PoolStateUpdater {
    pub fn new(query: Arc<dyn PoolQuery>, registry: SharedRegistry, config: UpdaterConfig) -> Self {
        Self {
            query,
            registry,
            config,
            watched: Arc::new(RwLock::new(BTreeMap::new())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Watches a pool and, for a meta pool, its base pool.
    ///
    /// # Errors
    /// Returns an error when the pool id is unknown.
    pub async fn watch_pool(&self, pool_id: &str) -> Result<(), DomainError> {
        let pools = {
            let registry = self.registry.read().await;
            registry
                .watch_set(pool_id)?
                .into_iter()
                .filter_map(|id| registry.pool(&id).map(|p| (p.id.clone(), p.address.clone())))
                .collect::<Vec<_>>()
        };

        let mut watched = self.watched.write().await;
        for (id, address) in pools {
            if watched.contains_key(&id) {
                continue;
            }
            debug!(pool = %id, address = %address, "Watching pool");
            watched.insert(
                id.clone(),
                PoolSyncState {
                    pool_id: id,
                    address,
                    status: SyncStatus::Pending,
                    last_update: None,
                    failure_count: 0,
                },
            );
        }
        Ok(())
    }

    /// Watches every registered pool.
    pub async fn watch_all(&self) {
        let ids: Vec<String> = self
            .registry
            .read()
            .await
            .pools()
            .map(|p| p.id.clone())
            .collect();
        for id in ids {
            // ids come from the registry itself
            let _ = self.watch_pool(&id).await;
        }
    }

    pub async fn unwatch_pool(&self, pool_id: &str) {
        if self.watched.write().await.remove(pool_id).is_some() {
            debug!(pool = %pool_id, "Stopped watching pool");
        }
    }

    /// Ids of watched pools, sorted.
    pub async fn watched(&self) -> Vec<String> {
        self.watched.read().await.keys().cloned().collect()
    }

    pub async fn status(&self) -> BTreeMap<String, PoolSyncState> {
        self.watched.read().await.clone()
    }

    pub async fn failed_pools(&self) -> Vec<String> {
        self.watched
            .read()
            .await
            .values()
            .filter(|s| s.status == SyncStatus::Failed)
            .map(|s| s.pool_id.clone())
            .collect()
    }

    /// Runs one polling round over every watched pool.
    pub async fn refresh_once(&self) -> RefreshResult {
        let targets: Vec<(String, String)> = self
            .watched
            .read()
            .await
            .values()
            .map(|s| (s.pool_id.clone(), s.address.clone()))
            .collect();

        let mut result = RefreshResult::default();
        for (pool_id, address) in targets {
            match self.refresh_pool(&pool_id, &address).await {
                Ok(()) => result.updated += 1,
                Err(e) => {
                    warn!(pool = %pool_id, error = %e, "Pool refresh failed");
                    result.failed += 1;
                    self.record_failure(&pool_id).await;
                }
            }
        }

        debug!(
            updated = result.updated,
            failed = result.failed,
            "Pool refresh round complete"
        );
        result
    }

    async fn refresh_pool(&self, pool_id: &str, address: &str) -> Result<(), SyncError> {
        let snapshot = self.query.get_pool_state(address).await?;
        self.registry.write().await.apply_snapshot(pool_id, snapshot)?;

        if let Some(state) = self.watched.write().await.get_mut(pool_id) {
            state.status = SyncStatus::InSync;
            state.last_update = Some(Instant::now());
            state.failure_count = 0;
        }
        Ok(())
    }

    async fn record_failure(&self, pool_id: &str) {
        let mut watched = self.watched.write().await;
        if let Some(state) = watched.get_mut(pool_id) {
            state.failure_count += 1;
            state.status = if state.failure_count >= self.config.max_failures {
                SyncStatus::Failed
            } else if state.last_update.is_some() {
                SyncStatus::Stale
            } else {
                SyncStatus::Pending
            };
        }
    }

    /// Polls until [`stop`](Self::stop) is called. The first round runs
    /// immediately.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        let pools = self.watched.read().await.len();
        info!(
            interval_ms = self.config.refresh_interval.as_millis() as u64,
            pools = pools,
            "Starting pool state updater"
        );

        let mut interval = tokio::time::interval(self.config.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.refresh_once().await;
        }

        info!("Pool state updater stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
