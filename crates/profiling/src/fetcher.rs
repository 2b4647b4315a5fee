//! Descriptor acquisition behind a trait boundary
//!
//! The engine consumes descriptors through [`DescriptorFetcher`]; backends
//! own acquisition, caching, and refresh. Two reference implementations are
//! provided: an in-memory registry for tests and degraded environments, and
//! a TTL cache that wraps an upstream fetcher with a background refresh
//! loop.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::{ProfilingError, DESCRIPTOR_KIND};
use crate::models::{ProfileDescriptor, WorkloadInstance};

/// Source of profile descriptors for workload instances.
#[async_trait]
pub trait DescriptorFetcher: Send + Sync {
    /// Current descriptor for the instance's owning workload. Absence is
    /// reported as the distinguishable NotFound error kind.
    async fn get_descriptor(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<ProfileDescriptor, ProfilingError>;

    /// Drive the backend's background refresh until `shutdown` fires.
    async fn run(&self, shutdown: broadcast::Receiver<()>);
}

/// Registry-backed fetcher with no upstream.
///
/// Descriptors are inserted and removed by the embedding process; useful for
/// tests and for environments without a live descriptor source.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    descriptors: DashMap<String, ProfileDescriptor>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self {
            descriptors: DashMap::new(),
        }
    }

    /// Register a descriptor under its `namespace/name` key.
    pub fn insert(&self, descriptor: ProfileDescriptor) {
        let key = format!("{}/{}", descriptor.namespace, descriptor.name);
        debug!(key = %key, "Registering profile descriptor");
        self.descriptors.insert(key, descriptor);
    }

    pub fn remove(&self, namespace: &str, name: &str) -> Option<ProfileDescriptor> {
        self.descriptors
            .remove(&format!("{namespace}/{name}"))
            .map(|(_, descriptor)| descriptor)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[async_trait]
impl DescriptorFetcher for InMemoryFetcher {
    async fn get_descriptor(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<ProfileDescriptor, ProfilingError> {
        let key = instance.descriptor_key();
        self.descriptors
            .get(&key)
            .map(|entry| entry.clone())
            .ok_or_else(|| ProfilingError::not_found(DESCRIPTOR_KIND, key))
    }

    async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            descriptors = self.descriptors.len(),
            "In-memory descriptor fetcher running"
        );
        let _ = shutdown.recv().await;
        info!("Shutting down in-memory descriptor fetcher");
    }
}

/// Cache behavior for [`CachingFetcher`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a fetched descriptor stays fresh.
    pub ttl: Duration,
    /// Interval between background refresh sweeps.
    pub refresh_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Snapshot of cache state.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub last_refresh_timestamp: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedDescriptor {
    descriptor: ProfileDescriptor,
    fetched_at: Instant,
}

/// TTL cache over an upstream fetcher with background refresh.
///
/// Cache misses and expired entries fall through to the upstream. When a
/// refresh fails and a stale copy exists, the stale copy keeps serving; a
/// descriptor deleted upstream drops out of the cache.
pub struct CachingFetcher {
    upstream: Arc<dyn DescriptorFetcher>,
    config: CacheConfig,
    cache: DashMap<String, CachedDescriptor>,
    /// Instances seen so far, re-fetched by the background sweep.
    instances: DashMap<String, WorkloadInstance>,
    last_refresh: AtomicI64,
}

impl CachingFetcher {
    pub fn new(upstream: Arc<dyn DescriptorFetcher>, config: CacheConfig) -> Self {
        Self {
            upstream,
            config,
            cache: DashMap::new(),
            instances: DashMap::new(),
            last_refresh: AtomicI64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let timestamp = self.last_refresh.load(Ordering::Relaxed);
        CacheStats {
            entries: self.cache.len(),
            last_refresh_timestamp: (timestamp != 0).then_some(timestamp),
        }
    }

    /// Re-fetch every tracked descriptor once.
    async fn refresh_all(&self) {
        let tracked: Vec<WorkloadInstance> = self
            .instances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for instance in tracked {
            let key = instance.descriptor_key();
            match self.upstream.get_descriptor(&instance).await {
                Ok(descriptor) => {
                    self.cache.insert(
                        key,
                        CachedDescriptor {
                            descriptor,
                            fetched_at: Instant::now(),
                        },
                    );
                }
                Err(err) if err.is_not_found() => {
                    debug!(key = %key, "Descriptor gone upstream, dropping cached copy");
                    self.cache.remove(&key);
                    self.instances.remove(&key);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Descriptor refresh failed, keeping cached copy");
                }
            }
        }

        self.last_refresh
            .store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
        debug!(entries = self.cache.len(), "Descriptor refresh sweep complete");
    }
}

#[async_trait]
impl DescriptorFetcher for CachingFetcher {
    async fn get_descriptor(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<ProfileDescriptor, ProfilingError> {
        let key = instance.descriptor_key();

        if let Some(entry) = self.cache.get(&key) {
            if entry.fetched_at.elapsed() < self.config.ttl {
                return Ok(entry.descriptor.clone());
            }
        }

        self.instances
            .entry(key.clone())
            .or_insert_with(|| instance.clone());

        match self.upstream.get_descriptor(instance).await {
            Ok(descriptor) => {
                self.cache.insert(
                    key,
                    CachedDescriptor {
                        descriptor: descriptor.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(descriptor)
            }
            Err(err) if err.is_not_found() => {
                self.cache.remove(&key);
                self.instances.remove(&key);
                Err(err)
            }
            Err(err) => {
                if let Some(stale) = self.cache.get(&key) {
                    warn!(key = %key, error = %err, "Upstream fetch failed, serving stale descriptor");
                    return Ok(stale.descriptor.clone());
                }
                Err(err)
            }
        }
    }

    async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            refresh_interval_secs = self.config.refresh_interval.as_secs(),
            ttl_secs = self.config.ttl.as_secs(),
            "Starting descriptor refresh loop"
        );

        let mut ticker = interval(self.config.refresh_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_all().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down descriptor refresh loop");
                    break;
                }
            }
        }
    }
}
