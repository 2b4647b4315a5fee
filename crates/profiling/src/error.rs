//! Error taxonomy for profiling decisions
//!
//! Every failure is returned to the caller as a classified error; the engine
//! never retries and never logs-and-swallows. The one intentional absorption
//! lives in the manager's plain baseline query, which converts a NotFound
//! descriptor into a negative membership result.

use thiserror::Error;

/// Resource kind reported when a profile descriptor is absent.
pub const DESCRIPTOR_KIND: &str = "profiledescriptors";

/// Resource kind reported when a named extended indicator set is absent.
pub const EXTENDED_INDICATORS_KIND: &str = "extendedindicators";

#[derive(Debug, Error)]
pub enum ProfilingError {
    /// Descriptor or named extended indicator set absent from the store.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    /// A bound, percent, or sentinel in the descriptor cannot be used.
    #[error("malformed target: {reason}")]
    MalformedTarget { reason: String },

    /// An indicator has a declared target but no observed value.
    #[error("indicator {indicator} current value not found")]
    IncompleteData { indicator: String },

    /// A stored payload is not coercible into the requested shape.
    #[error("{name} indicators cannot convert to the requested shape: {reason}")]
    TypeMismatch { name: String, reason: String },

    /// Transport or backend failure from the descriptor fetcher.
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

impl ProfilingError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn malformed_target(reason: impl Into<String>) -> Self {
        Self::MalformedTarget {
            reason: reason.into(),
        }
    }

    pub fn incomplete_data(indicator: impl Into<String>) -> Self {
        Self::IncompleteData {
            indicator: indicator.into(),
        }
    }

    pub fn type_mismatch(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the distinguishable NotFound kind, recoverable by callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProfilingError::NotFound { .. })
    }
}
