//! Error kinds for the ski rose pipeline.
//!
//! Per-run and per-segment errors ([`RoseError::InsufficientGeometry`],
//! [`RoseError::DuplicatePointIndex`], [`RoseError::UndefinedBearing`]) are isolated and
//! collected into a [`SkipReport`](crate::aggregate::SkipReport). Everything else aborts
//! the analysis run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoseError {
    #[error("run {run_id} has {points} usable point(s), at least 2 are required")]
    InsufficientGeometry { run_id: String, points: usize },

    #[error("run {run_id} repeats point index {index}")]
    DuplicatePointIndex { run_id: String, index: u32 },

    #[error("segment has no horizontal displacement, bearing is undefined")]
    UndefinedBearing,

    #[error("group {group} has zero total weight")]
    EmptyGroup { group: String },

    #[error("coordinate ({longitude}, {latitude}) in run {run_id} is not WGS84 degrees")]
    InconsistentUnits {
        run_id: String,
        longitude: f64,
        latitude: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RoseError {
    /// Whether this error only invalidates a single run or segment.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RoseError::InsufficientGeometry { .. }
                | RoseError::DuplicatePointIndex { .. }
                | RoseError::UndefinedBearing
                | RoseError::EmptyGroup { .. }
        )
    }
}

pub type Result<T, E = RoseError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        let skip = RoseError::InsufficientGeometry {
            run_id: "r1".into(),
            points: 1,
        };
        assert!(skip.is_recoverable());
        assert!(RoseError::UndefinedBearing.is_recoverable());

        let fatal = RoseError::InconsistentUnits {
            run_id: "r1".into(),
            longitude: 512_000.0,
            latitude: 4_650_000.0,
        };
        assert!(!fatal.is_recoverable());
        assert!(!RoseError::InvalidConfig("num_bins".into()).is_recoverable());
    }

    #[test]
    fn test_messages_name_the_run() {
        let err = RoseError::DuplicatePointIndex {
            run_id: "run-7".into(),
            index: 3,
        };
        assert_eq!(err.to_string(), "run run-7 repeats point index 3");
    }
}
