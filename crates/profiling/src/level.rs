//! Performance level classification and aggregation
//!
//! Classifies observed indicator values against declared bounds and reduces
//! the per-indicator levels to the workload's worst-case level.

use serde::{Deserialize, Serialize};

use crate::error::ProfilingError;
use crate::models::{IndicatorTargets, IndicatorValues, TargetBounds};

/// Discrete performance level for a workload.
///
/// Smaller non-negative rank means better performance. `Unknown` is a
/// sentinel for "cannot be determined" and never takes part in
/// better/worse comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Unknown,
    Perfect,
    Good,
    Poor,
}

impl PerformanceLevel {
    /// Rank used for worst-case selection: Unknown -1, Perfect 0, Good 1,
    /// Poor 2.
    const fn rank(self) -> i8 {
        match self {
            PerformanceLevel::Unknown => -1,
            PerformanceLevel::Perfect => 0,
            PerformanceLevel::Good => 1,
            PerformanceLevel::Poor => 2,
        }
    }

    /// True when `self` represents poorer performance than `other`.
    pub fn is_poorer_than(self, other: PerformanceLevel) -> bool {
        self.rank() > other.rank()
    }
}

/// Classify one observed value against one target's bounds.
///
/// Breaching the ceiling is penalized as `Poor`; beating the floor is
/// rewarded as `Perfect`. The comfortable middle is merely `Good`: only
/// demonstrably-exceeding performance earns the best label.
pub fn classify(value: f64, target: &TargetBounds) -> PerformanceLevel {
    if let Some(upper) = target.upper_bound {
        if value > upper {
            return PerformanceLevel::Poor;
        }
    }
    if let Some(lower) = target.lower_bound {
        if value < lower {
            return PerformanceLevel::Perfect;
        }
    }
    PerformanceLevel::Good
}

/// Reduce declared targets and observed values to the poorest level.
///
/// Every declared indicator must have an observed value; a missing value is
/// a hard `IncompleteData` failure, not an omission. An empty target map
/// yields `Unknown`: the initial accumulator is never raised and no signal
/// is available, deliberately distinct from a real `Perfect`.
pub fn aggregate(
    targets: &IndicatorTargets,
    values: &IndicatorValues,
) -> Result<PerformanceLevel, ProfilingError> {
    let mut result = PerformanceLevel::Unknown;
    for (indicator, target) in targets {
        let value = values
            .get(indicator)
            .ok_or_else(|| ProfilingError::incomplete_data(indicator.as_str()))?;

        let level = classify(*value, target);
        if level.is_poorer_than(result) {
            result = level;
        }
    }
    Ok(result)
}
