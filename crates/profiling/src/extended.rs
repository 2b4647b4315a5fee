//! Extended indicator resolution
//!
//! Locates a named extended indicator set in a descriptor, coerces its
//! opaque payload into the caller's concrete shape, and reports the entry's
//! baseline membership. The sequence is atomic from the caller's side:
//! either the output is populated and a membership boolean comes back, or an
//! error comes back and the output is untouched.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::baseline;
use crate::error::{ProfilingError, EXTENDED_INDICATORS_KIND};
use crate::models::{ProfileDescriptor, WorkloadInstance};

/// Caller-typed view of an extended indicator payload.
///
/// Implementors form the closed set of shapes the engine knows how to
/// populate; the declared set name is the shape tag matched against
/// descriptor entries. `coerce_from` must leave the receiver exactly as it
/// was on failure. Parsing through [`coerce_payload`] into a temporary and
/// assigning on success gives that guarantee:
///
/// ```
/// use profiling::{coerce_payload, ExtendedIndicators, ProfilingError};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct MemoryTuningIndicators {
///     reclaim_ratio: f64,
/// }
///
/// impl MemoryTuningIndicators {
///     const NAME: &'static str = "memory-tuning";
/// }
///
/// impl ExtendedIndicators for MemoryTuningIndicators {
///     fn set_name(&self) -> &str {
///         Self::NAME
///     }
///
///     fn coerce_from(&mut self, payload: &serde_json::Value) -> Result<(), ProfilingError> {
///         *self = coerce_payload(Self::NAME, payload)?;
///         Ok(())
///     }
/// }
/// ```
pub trait ExtendedIndicators: Send {
    /// Declared name of the indicator set, matched against descriptor
    /// entries.
    fn set_name(&self) -> &str;

    /// Replace `self` with the payload's coerced value.
    fn coerce_from(&mut self, payload: &Value) -> Result<(), ProfilingError>;
}

/// Deserialize an opaque payload into a concrete shape, naming the set in
/// the failure. The structural check and the conversion are one step: a
/// payload that does not fit the shape produces a TypeMismatch and no
/// partial value.
pub fn coerce_payload<T: DeserializeOwned>(
    set_name: &str,
    payload: &Value,
) -> Result<T, ProfilingError> {
    serde_json::from_value(payload.clone())
        .map_err(|err| ProfilingError::type_mismatch(set_name, err.to_string()))
}

/// Resolve the extended indicator set matching `out` from the descriptor.
///
/// Scans for the first entry whose name matches the output's shape tag,
/// evaluates the entry's baseline membership (its own percent plus the
/// descriptor-level extended sentinel), then coerces the payload into the
/// output. Membership is evaluated before the output is written so a
/// malformed percent or sentinel can never leave `out` half-populated.
pub fn resolve_extended_indicators(
    descriptor: &ProfileDescriptor,
    instance: &WorkloadInstance,
    out: &mut dyn ExtendedIndicators,
) -> Result<bool, ProfilingError> {
    let name = out.set_name().to_string();

    let entry = descriptor
        .extended_indicators
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| ProfilingError::not_found(EXTENDED_INDICATORS_KIND, name.as_str()))?;

    let payload = match &entry.indicators {
        Some(value) if !value.is_null() => value,
        _ => {
            return Err(ProfilingError::malformed_target(format!(
                "{name} indicators payload is empty"
            )))
        }
    };

    let member = baseline::is_extended_baseline(
        instance,
        &name,
        entry.baseline_percent,
        descriptor.extended_baseline_sentinel.as_deref(),
    )?;

    out.coerce_from(payload)?;

    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtendedIndicatorEntry;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct MemoryTuningIndicators {
        reclaim_ratio: f64,
        swap_enabled: bool,
    }

    impl MemoryTuningIndicators {
        const NAME: &'static str = "memory-tuning";
    }

    impl ExtendedIndicators for MemoryTuningIndicators {
        fn set_name(&self) -> &str {
            Self::NAME
        }

        fn coerce_from(&mut self, payload: &Value) -> Result<(), ProfilingError> {
            *self = coerce_payload(Self::NAME, payload)?;
            Ok(())
        }
    }

    fn instance() -> WorkloadInstance {
        WorkloadInstance::new("uid-1", "web-7d9f", "shop").with_workload("web")
    }

    fn descriptor_with(entry: ExtendedIndicatorEntry) -> ProfileDescriptor {
        ProfileDescriptor {
            name: "web".to_string(),
            namespace: "shop".to_string(),
            extended_baseline_sentinel: Some("ext-sentinel".to_string()),
            extended_indicators: vec![entry],
            ..ProfileDescriptor::default()
        }
    }

    #[test]
    fn test_round_trip_matching_shape() {
        let descriptor = descriptor_with(ExtendedIndicatorEntry {
            name: MemoryTuningIndicators::NAME.to_string(),
            indicators: Some(json!({"reclaim_ratio": 0.25, "swap_enabled": true})),
            baseline_percent: Some(100),
        });

        let mut out = MemoryTuningIndicators::default();
        let member = resolve_extended_indicators(&descriptor, &instance(), &mut out).unwrap();

        assert!(member);
        assert_eq!(
            out,
            MemoryTuningIndicators {
                reclaim_ratio: 0.25,
                swap_enabled: true,
            }
        );
    }

    #[test]
    fn test_incompatible_payload_leaves_output_untouched() {
        let descriptor = descriptor_with(ExtendedIndicatorEntry {
            name: MemoryTuningIndicators::NAME.to_string(),
            indicators: Some(json!({"reclaim_ratio": "aggressive"})),
            baseline_percent: Some(100),
        });

        let mut out = MemoryTuningIndicators {
            reclaim_ratio: 0.5,
            swap_enabled: true,
        };
        let err = resolve_extended_indicators(&descriptor, &instance(), &mut out).unwrap_err();

        assert!(matches!(err, ProfilingError::TypeMismatch { .. }));
        assert!(err.to_string().contains(MemoryTuningIndicators::NAME));
        assert_eq!(out.reclaim_ratio, 0.5);
        assert!(out.swap_enabled);
    }

    #[test]
    fn test_unknown_set_is_not_found() {
        let descriptor = descriptor_with(ExtendedIndicatorEntry {
            name: "network-tuning".to_string(),
            indicators: Some(json!({})),
            baseline_percent: None,
        });

        let mut out = MemoryTuningIndicators::default();
        let err = resolve_extended_indicators(&descriptor, &instance(), &mut out).unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("memory-tuning"));
        assert!(err.to_string().contains(EXTENDED_INDICATORS_KIND));
    }

    #[test]
    fn test_null_payload_is_rejected() {
        let descriptor = descriptor_with(ExtendedIndicatorEntry {
            name: MemoryTuningIndicators::NAME.to_string(),
            indicators: Some(Value::Null),
            baseline_percent: Some(100),
        });

        let mut out = MemoryTuningIndicators::default();
        let err = resolve_extended_indicators(&descriptor, &instance(), &mut out).unwrap_err();
        assert!(err.to_string().contains("payload is empty"));
    }

    #[test]
    fn test_malformed_percent_leaves_output_untouched() {
        let descriptor = descriptor_with(ExtendedIndicatorEntry {
            name: MemoryTuningIndicators::NAME.to_string(),
            indicators: Some(json!({"reclaim_ratio": 0.25, "swap_enabled": true})),
            baseline_percent: Some(400),
        });

        let mut out = MemoryTuningIndicators::default();
        let err = resolve_extended_indicators(&descriptor, &instance(), &mut out).unwrap_err();

        assert!(matches!(err, ProfilingError::MalformedTarget { .. }));
        assert_eq!(out, MemoryTuningIndicators::default());
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let mut descriptor = descriptor_with(ExtendedIndicatorEntry {
            name: MemoryTuningIndicators::NAME.to_string(),
            indicators: Some(json!({"reclaim_ratio": 0.1, "swap_enabled": false})),
            baseline_percent: Some(100),
        });
        descriptor.extended_indicators.push(ExtendedIndicatorEntry {
            name: MemoryTuningIndicators::NAME.to_string(),
            indicators: Some(json!({"reclaim_ratio": 0.9, "swap_enabled": true})),
            baseline_percent: Some(100),
        });

        let mut out = MemoryTuningIndicators::default();
        resolve_extended_indicators(&descriptor, &instance(), &mut out).unwrap();
        assert_eq!(out.reclaim_ratio, 0.1);
    }
}
