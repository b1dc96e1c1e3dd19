//! Error types for the polystat pipeline.
//!
//! None of these errors ever escape [`Pipeline::recompute`](crate::Pipeline::recompute).
//! Configuration problems degrade a single tile and are reported back through
//! [`PanelState::warnings`](crate::PanelState::warnings); data problems blank
//! the whole panel to its empty state.

use thiserror::Error;

/// A configuration value names something the pipeline cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The aggregation operator is not one of the supported names.
    #[error("unknown aggregation operator '{operator}' for series '{series}'")]
    UnknownOperator {
        /// Operator name as configured
        operator: String,
        /// Series that was being aggregated
        series: String,
    },

    /// The unit format key has no registered formatter.
    #[error("unknown unit format '{0}'")]
    UnknownUnitFormat(String),
}

/// Raw series input could not be turned into a [`RawSeries`](crate::RawSeries).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// The payload has no `datapoints` member, or it is not an array.
    #[error("series '{series}' has no datapoints")]
    MissingDatapoints {
        /// Series alias (or `<unnamed>`)
        series: String,
    },

    /// A point is not a `[value, timestamp]` pair.
    #[error("series '{series}' point {index} is malformed: {reason}")]
    MalformedPoint {
        /// Series alias
        series: String,
        /// Position of the point in the payload
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A point carries a NaN or infinite timestamp.
    #[error("series '{series}' point {index} has a non-finite timestamp")]
    NonFiniteTimestamp {
        /// Series alias
        series: String,
        /// Position of the point in the payload
        index: usize,
    },

    /// The payload has no usable `target` alias.
    #[error("series payload at position {0} has no target name")]
    MissingTarget(usize),

    /// The host reported a query failure instead of data.
    #[error("data source error: {0}")]
    Source(String),
}

/// Any problem the pipeline can observe while recomputing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// See [`ConfigurationError`].
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// See [`DataError`].
    #[error(transparent)]
    Data(#[from] DataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operator_message_names_series() {
        let err = ConfigurationError::UnknownOperator {
            operator: "median".to_string(),
            series: "svc-a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown aggregation operator 'median' for series 'svc-a'"
        );
    }

    #[test]
    fn test_pipeline_error_is_transparent() {
        let err: PipelineError = DataError::MissingTarget(3).into();
        assert_eq!(err.to_string(), "series payload at position 3 has no target name");
        assert!(matches!(err, PipelineError::Data(DataError::MissingTarget(3))));
    }
}
