//! Profiling manager façade and its public contract
//!
//! [`ServiceProfiler`] is the capability downstream resource management
//! codes against. [`ProfilingManager`] implements it over a descriptor
//! fetcher; [`DummyProfilingManager`] implements it over a fixed table so
//! callers stay agnostic to which one is wired in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::baseline;
use crate::error::ProfilingError;
use crate::extended::{resolve_extended_indicators, ExtendedIndicators};
use crate::fetcher::DescriptorFetcher;
use crate::level::{aggregate, PerformanceLevel};
use crate::models::{IndicatorTargets, WorkloadInstance, MAX_PERFORMANCE_SCORE};

/// Public profiling contract.
///
/// Each operation is a single request/response with no cross-call state;
/// `run` is the one long-running call and simply drives the backing store's
/// lifecycle.
#[async_trait]
pub trait ServiceProfiler: Send + Sync {
    /// Poorest business indicator level for the instance's workload.
    async fn business_performance_level(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<PerformanceLevel, ProfilingError>;

    /// Business performance score in
    /// [`MIN_PERFORMANCE_SCORE`](crate::models::MIN_PERFORMANCE_SCORE)..=[`MAX_PERFORMANCE_SCORE`].
    async fn business_performance_score(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<f64, ProfilingError>;

    /// Declared system indicator targets for the instance's workload.
    async fn system_performance_target(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<IndicatorTargets, ProfilingError>;

    /// Whether the instance belongs to the default baseline cohort.
    ///
    /// A missing descriptor means the instance is simply not a candidate
    /// and yields `false` without an error; every other failure propagates.
    async fn baseline(&self, instance: &WorkloadInstance) -> Result<bool, ProfilingError>;

    /// Populate `out` from the matching extended indicator set and report
    /// that set's baseline membership. Unlike the plain baseline query, a
    /// missing descriptor propagates as an error here.
    async fn extended_indicator(
        &self,
        instance: &WorkloadInstance,
        out: &mut dyn ExtendedIndicators,
    ) -> Result<bool, ProfilingError>;

    /// Drive the backing store's background lifecycle until shutdown.
    async fn run(&self, shutdown: broadcast::Receiver<()>);
}

/// Profiler backed by a live descriptor source.
pub struct ProfilingManager {
    fetcher: Arc<dyn DescriptorFetcher>,
}

impl ProfilingManager {
    pub fn new(fetcher: Arc<dyn DescriptorFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ServiceProfiler for ProfilingManager {
    async fn business_performance_level(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<PerformanceLevel, ProfilingError> {
        let descriptor = self.fetcher.get_descriptor(instance).await?;
        let targets = descriptor.business_indicator_targets()?;
        let values = descriptor.business_indicator_values();

        let level = aggregate(&targets, &values)?;
        debug!(
            instance = %instance.name,
            level = ?level,
            "Aggregated business performance level"
        );
        Ok(level)
    }

    async fn business_performance_score(
        &self,
        _instance: &WorkloadInstance,
    ) -> Result<f64, ProfilingError> {
        // TODO: derive the score from descriptor indicators once the scoring
        // algorithm is settled; until then every workload scores the maximum.
        Ok(MAX_PERFORMANCE_SCORE)
    }

    async fn system_performance_target(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<IndicatorTargets, ProfilingError> {
        let descriptor = self.fetcher.get_descriptor(instance).await?;
        descriptor.system_indicator_targets()
    }

    async fn baseline(&self, instance: &WorkloadInstance) -> Result<bool, ProfilingError> {
        let descriptor = match self.fetcher.get_descriptor(instance).await {
            Ok(descriptor) => descriptor,
            // No descriptor means the instance is not a baseline candidate.
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err),
        };

        baseline::is_baseline(
            instance,
            descriptor.baseline_percent,
            descriptor.baseline_sentinel.as_deref(),
        )
    }

    async fn extended_indicator(
        &self,
        instance: &WorkloadInstance,
        out: &mut dyn ExtendedIndicators,
    ) -> Result<bool, ProfilingError> {
        let descriptor = self.fetcher.get_descriptor(instance).await?;
        resolve_extended_indicators(&descriptor, instance, out)
    }

    async fn run(&self, shutdown: broadcast::Receiver<()>) {
        self.fetcher.run(shutdown).await;
    }
}

/// Precomputed outcome for one workload instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DummyWorkloadProfile {
    pub level: PerformanceLevel,
    pub score: f64,
}

/// Table-backed profiler for environments without a live descriptor source.
///
/// Missing entries fail open: Perfect level and maximum score. Baseline and
/// extended indicator queries always report `false` and leave the caller's
/// output untouched.
#[derive(Debug, Default)]
pub struct DummyProfilingManager {
    profiles: HashMap<String, DummyWorkloadProfile>,
}

impl DummyProfilingManager {
    pub fn new(profiles: HashMap<String, DummyWorkloadProfile>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl ServiceProfiler for DummyProfilingManager {
    async fn business_performance_level(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<PerformanceLevel, ProfilingError> {
        Ok(self
            .profiles
            .get(&instance.uid)
            .map(|profile| profile.level)
            .unwrap_or(PerformanceLevel::Perfect))
    }

    async fn business_performance_score(
        &self,
        instance: &WorkloadInstance,
    ) -> Result<f64, ProfilingError> {
        Ok(self
            .profiles
            .get(&instance.uid)
            .map(|profile| profile.score)
            .unwrap_or(MAX_PERFORMANCE_SCORE))
    }

    async fn system_performance_target(
        &self,
        _instance: &WorkloadInstance,
    ) -> Result<IndicatorTargets, ProfilingError> {
        Ok(IndicatorTargets::new())
    }

    async fn baseline(&self, _instance: &WorkloadInstance) -> Result<bool, ProfilingError> {
        Ok(false)
    }

    async fn extended_indicator(
        &self,
        _instance: &WorkloadInstance,
        _out: &mut dyn ExtendedIndicators,
    ) -> Result<bool, ProfilingError> {
        Ok(false)
    }

    async fn run(&self, _shutdown: broadcast::Receiver<()>) {}
}
