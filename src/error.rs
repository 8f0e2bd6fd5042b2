//! Error types for the fill engine.

use thiserror::Error;

use crate::types::Phase;

/// Failure reported by a geometry or growth oracle.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct OracleError(pub String);

#[derive(Debug, Error)]
pub enum FillError {
    #[error("oracle failed during {phase} while scoring {candidate}: {source}")]
    OracleFailure {
        phase: Phase,
        candidate: String,
        #[source]
        source: OracleError,
    },

    #[error("invalid variety `{name}`: {reason}")]
    InvalidVariety { name: String, reason: String },

    #[error("garden bounds must be positive and finite, got {width} x {height}")]
    InvalidBounds { width: f64, height: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not start evaluation workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("malformed fill parameters: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = FillError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_failure_names_phase_and_candidate() {
        let err = FillError::OracleFailure {
            phase: Phase::Greedy,
            candidate: "azalea at (3, 4)".into(),
            source: OracleError("yield diverged".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("greedy fill"));
        assert!(msg.contains("azalea at (3, 4)"));
        assert!(msg.contains("yield diverged"));
    }

    #[test]
    fn json_errors_convert() {
        let parsed: std::result::Result<crate::types::FillParams, _> = serde_json::from_str("{");
        let err: FillError = parsed.unwrap_err().into();
        assert!(matches!(err, FillError::Json(_)));
    }
}
