//! Deterministic baseline cohort sampling
//!
//! Maps a (sentinel, instance) pair to a stable point in [0, 100) and
//! compares it against the configured percent. No random state is involved:
//! identical inputs agree across calls and across process restarts, so the
//! cohort is reproducible.

use sha2::{Digest, Sha256};

use crate::error::ProfilingError;
use crate::models::WorkloadInstance;

/// Lowest valid baseline percent.
pub const BASELINE_PERCENT_MIN: i32 = 0;

/// Highest valid baseline percent.
pub const BASELINE_PERCENT_MAX: i32 = 100;

/// Whether the instance belongs to the descriptor's default baseline cohort.
///
/// An absent percent means sampling is not configured for the descriptor and
/// the whole cohort is baseline. A percent outside [0, 100], or a missing
/// sentinel when one is needed, is a malformed-target error; membership is
/// never defaulted to true on failure.
pub fn is_baseline(
    instance: &WorkloadInstance,
    percent: Option<i32>,
    sentinel: Option<&str>,
) -> Result<bool, ProfilingError> {
    membership(instance, None, percent, sentinel)
}

/// Whether the instance belongs to the baseline cohort of one named extended
/// indicator set.
///
/// The set name stratifies the sample point, so different sets draw
/// independent cohorts from the same sentinel.
pub fn is_extended_baseline(
    instance: &WorkloadInstance,
    set_name: &str,
    percent: Option<i32>,
    sentinel: Option<&str>,
) -> Result<bool, ProfilingError> {
    membership(instance, Some(set_name), percent, sentinel)
}

fn membership(
    instance: &WorkloadInstance,
    set_name: Option<&str>,
    percent: Option<i32>,
    sentinel: Option<&str>,
) -> Result<bool, ProfilingError> {
    let Some(percent) = percent else {
        // Sampling not configured: the whole cohort is baseline.
        return Ok(true);
    };

    if !(BASELINE_PERCENT_MIN..=BASELINE_PERCENT_MAX).contains(&percent) {
        return Err(ProfilingError::malformed_target(format!(
            "baseline percent {percent} outside [{BASELINE_PERCENT_MIN}, {BASELINE_PERCENT_MAX}]"
        )));
    }

    // Degenerate percents decide membership without a sentinel.
    if percent == BASELINE_PERCENT_MIN {
        return Ok(false);
    }
    if percent == BASELINE_PERCENT_MAX {
        return Ok(true);
    }

    let sentinel = sentinel.ok_or_else(|| {
        ProfilingError::malformed_target("baseline sentinel missing from descriptor")
    })?;

    Ok((sample_point(sentinel, set_name, &instance.uid) as i32) < percent)
}

/// Stable point in [0, 100) for a (sentinel, set, instance) triple.
fn sample_point(sentinel: &str, set_name: Option<&str>, uid: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(sentinel.as_bytes());
    if let Some(name) = set_name {
        hasher.update(b"/");
        hasher.update(name.as_bytes());
    }
    hasher.update(b"/");
    hasher.update(uid.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(uid: &str) -> WorkloadInstance {
        WorkloadInstance::new(uid, format!("pod-{uid}"), "shop").with_workload("web")
    }

    #[test]
    fn test_membership_is_deterministic() {
        let pod = instance("uid-42");
        let first = is_baseline(&pod, Some(30), Some("sentinel-a")).unwrap();
        for _ in 0..10 {
            assert_eq!(is_baseline(&pod, Some(30), Some("sentinel-a")).unwrap(), first);
        }
    }

    #[test]
    fn test_degenerate_percents_skip_sentinel() {
        let pod = instance("uid-1");
        assert!(!is_baseline(&pod, Some(0), None).unwrap());
        assert!(is_baseline(&pod, Some(100), None).unwrap());
    }

    #[test]
    fn test_absent_percent_means_sampling_disabled() {
        let pod = instance("uid-1");
        assert!(is_baseline(&pod, None, None).unwrap());
    }

    #[test]
    fn test_out_of_range_percent_is_malformed() {
        let pod = instance("uid-1");
        assert!(is_baseline(&pod, Some(120), Some("s")).is_err());
        assert!(is_baseline(&pod, Some(-1), Some("s")).is_err());
    }

    #[test]
    fn test_missing_sentinel_is_malformed() {
        let pod = instance("uid-1");
        let err = is_baseline(&pod, Some(30), None).unwrap_err();
        assert!(err.to_string().contains("sentinel"));
    }

    #[test]
    fn test_extended_sets_draw_independent_cohorts() {
        // Across many instances, membership in two differently-named sets
        // must not be identical everywhere.
        let mut diverged = false;
        for i in 0..200 {
            let pod = instance(&format!("uid-{i}"));
            let a = is_extended_baseline(&pod, "memory-tuning", Some(50), Some("s")).unwrap();
            let b = is_extended_baseline(&pod, "network-tuning", Some(50), Some("s")).unwrap();
            if a != b {
                diverged = true;
                break;
            }
        }
        assert!(diverged);
    }

    #[test]
    fn test_membership_rate_tracks_percent() {
        let percent = 30;
        let total = 2000;
        let members = (0..total)
            .filter(|i| {
                is_baseline(&instance(&format!("uid-{i}")), Some(percent), Some("sentinel"))
                    .unwrap()
            })
            .count();

        let rate = members as f64 / total as f64;
        assert!(
            (rate - 0.30).abs() < 0.05,
            "membership rate {rate} strayed from {percent}%"
        );
    }
}
