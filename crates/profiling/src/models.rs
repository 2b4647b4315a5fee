//! Core data model for workload profile descriptors

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ProfilingError;

/// Highest possible business performance score.
pub const MAX_PERFORMANCE_SCORE: f64 = 100.0;

/// Lowest possible business performance score.
pub const MIN_PERFORMANCE_SCORE: f64 = 0.0;

/// Upper and lower bound pair declared for a single indicator.
///
/// An absent bound leaves that side unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetBounds {
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
}

impl TargetBounds {
    pub fn upper(value: f64) -> Self {
        Self {
            upper_bound: Some(value),
            lower_bound: None,
        }
    }

    pub fn lower(value: f64) -> Self {
        Self {
            upper_bound: None,
            lower_bound: Some(value),
        }
    }

    pub fn range(lower: f64, upper: f64) -> Self {
        Self {
            upper_bound: Some(upper),
            lower_bound: Some(lower),
        }
    }
}

/// Indicator name -> declared bounds.
pub type IndicatorTargets = HashMap<String, TargetBounds>;

/// Indicator name -> currently observed value.
pub type IndicatorValues = HashMap<String, f64>;

/// A named extended indicator set stored opaquely in the descriptor.
///
/// The payload keeps its loose JSON shape until a caller asks for a typed
/// view; each set samples its own baseline cohort via `baseline_percent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedIndicatorEntry {
    pub name: String,
    pub indicators: Option<Value>,
    pub baseline_percent: Option<i32>,
}

/// Profile descriptor for one workload: declared business and system
/// indicator targets, observed business values, baseline sampling
/// configuration, and extended indicator sets.
///
/// Descriptors are owned and mutated by the fetcher's backing store; the
/// engine only reads the copy handed to it per call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDescriptor {
    pub name: String,
    pub namespace: String,
    pub business_targets: IndicatorTargets,
    pub business_values: IndicatorValues,
    pub system_targets: IndicatorTargets,
    pub baseline_percent: Option<i32>,
    pub baseline_sentinel: Option<String>,
    pub extended_baseline_sentinel: Option<String>,
    pub extended_indicators: Vec<ExtendedIndicatorEntry>,
}

impl ProfileDescriptor {
    /// Declared business indicator targets, validated.
    pub fn business_indicator_targets(&self) -> Result<IndicatorTargets, ProfilingError> {
        validate_targets(&self.business_targets)?;
        Ok(self.business_targets.clone())
    }

    /// Currently observed business indicator values.
    pub fn business_indicator_values(&self) -> IndicatorValues {
        self.business_values.clone()
    }

    /// Declared system indicator targets, validated.
    pub fn system_indicator_targets(&self) -> Result<IndicatorTargets, ProfilingError> {
        validate_targets(&self.system_targets)?;
        Ok(self.system_targets.clone())
    }
}

/// Reject bound pairs where the floor sits above the ceiling.
fn validate_targets(targets: &IndicatorTargets) -> Result<(), ProfilingError> {
    for (indicator, bounds) in targets {
        if let (Some(upper), Some(lower)) = (bounds.upper_bound, bounds.lower_bound) {
            if lower > upper {
                return Err(ProfilingError::malformed_target(format!(
                    "indicator {indicator} lower bound {lower} exceeds upper bound {upper}"
                )));
            }
        }
    }
    Ok(())
}

/// The runtime unit being profiled (e.g., a running pod).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadInstance {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    /// Name of the owning workload; the instance name stands in when absent.
    pub workload: Option<String>,
}

impl WorkloadInstance {
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            namespace: namespace.into(),
            workload: None,
        }
    }

    pub fn with_workload(mut self, workload: impl Into<String>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    /// Key identifying the descriptor for this instance's owning workload.
    pub fn descriptor_key(&self) -> String {
        let owner = self.workload.as_deref().unwrap_or(&self.name);
        format!("{}/{}", self.namespace, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_key_prefers_workload() {
        let instance = WorkloadInstance::new("uid-1", "web-7d9f", "shop").with_workload("web");
        assert_eq!(instance.descriptor_key(), "shop/web");
    }

    #[test]
    fn test_descriptor_key_falls_back_to_name() {
        let instance = WorkloadInstance::new("uid-2", "standalone", "shop");
        assert_eq!(instance.descriptor_key(), "shop/standalone");
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut descriptor = ProfileDescriptor::default();
        descriptor
            .business_targets
            .insert("p99_latency".to_string(), TargetBounds::range(100.0, 10.0));

        let err = descriptor.business_indicator_targets().unwrap_err();
        assert!(err.to_string().contains("p99_latency"));
    }

    #[test]
    fn test_valid_bounds_pass_through() {
        let mut descriptor = ProfileDescriptor::default();
        descriptor
            .system_targets
            .insert("cpu_usage".to_string(), TargetBounds::range(0.1, 0.8));

        let targets = descriptor.system_indicator_targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets["cpu_usage"].upper_bound, Some(0.8));
    }
}
