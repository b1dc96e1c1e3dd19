//! Series aggregation: one raw series in, one tile out.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::model::{RawSeries, TileModel};

/// Reduces a series to a tile.
pub trait Aggregator: Send + Sync {
    /// Aggregates `series` with the operator named `operator`.
    ///
    /// An unknown operator is a [`ConfigurationError`]. A series without
    /// points must still produce a tile, with a `NaN` value and threshold
    /// level 0.
    fn aggregate(&self, operator: &str, series: &RawSeries) -> Result<TileModel, ConfigurationError>;
}

/// Supported aggregation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Avg,
    Count,
    Current,
    Delta,
    Diff,
    First,
    LogMin,
    Max,
    Min,
    Name,
    LastTime,
    TimeStep,
    Total,
}

impl Operator {
    /// Every operator, in option-list order.
    pub const ALL: [Operator; 13] = [
        Operator::Avg,
        Operator::Count,
        Operator::Current,
        Operator::Delta,
        Operator::Diff,
        Operator::First,
        Operator::LogMin,
        Operator::Max,
        Operator::Min,
        Operator::Name,
        Operator::LastTime,
        Operator::TimeStep,
        Operator::Total,
    ];

    /// Name used in the panel record.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Avg => "avg",
            Operator::Count => "count",
            Operator::Current => "current",
            Operator::Delta => "delta",
            Operator::Diff => "diff",
            Operator::First => "first",
            Operator::LogMin => "logmin",
            Operator::Max => "max",
            Operator::Min => "min",
            Operator::Name => "name",
            Operator::LastTime => "last_time",
            Operator::TimeStep => "time_step",
            Operator::Total => "total",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operator name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperatorError(String);

impl fmt::Display for ParseOperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown aggregation operator: {}", self.0)
    }
}

impl std::error::Error for ParseOperatorError {}

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ParseOperatorError(s.to_owned()))
    }
}

/// Grafana-style time series statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesAggregator;

impl Aggregator for SeriesAggregator {
    fn aggregate(&self, operator: &str, series: &RawSeries) -> Result<TileModel, ConfigurationError> {
        let op: Operator = operator
            .parse()
            .map_err(|_| ConfigurationError::UnknownOperator {
                operator: operator.to_string(),
                series: series.name.clone(),
            })?;

        let values: Vec<(f64, f64)> = series
            .points
            .iter()
            .filter(|p| !p.value.is_nan())
            .map(|p| (p.timestamp, p.value))
            .collect();

        let mut tile = TileModel::new(series.name.clone(), reduce(op, &values));
        tile.operator = op.as_str().to_string();
        tile.timestamp = values.last().map(|&(ts, _)| ts);
        if op == Operator::Name {
            tile.value_formatted = Some(series.name.clone());
        }
        Ok(tile)
    }
}

fn reduce(op: Operator, points: &[(f64, f64)]) -> f64 {
    let (Some(&(_, first)), Some(&(last_ts, last))) = (points.first(), points.last()) else {
        return f64::NAN;
    };
    let values = points.iter().map(|&(_, v)| v);

    match op {
        Operator::Avg => values.sum::<f64>() / points.len() as f64,
        Operator::Count => points.len() as f64,
        Operator::Current => last,
        Operator::Delta => delta(points),
        Operator::Diff => last - first,
        Operator::First => first,
        Operator::LogMin => values.filter(|v| *v > 0.0).fold(f64::NAN, f64::min),
        Operator::Max => values.fold(f64::NAN, f64::max),
        Operator::Min => values.fold(f64::NAN, f64::min),
        Operator::Name => f64::NAN,
        Operator::LastTime => last_ts,
        Operator::TimeStep => points
            .windows(2)
            .map(|w| w[1].0 - w[0].0)
            .fold(f64::NAN, f64::min),
        Operator::Total => values.sum(),
    }
}

/// Sum of increments, treating a drop as a counter reset.
fn delta(points: &[(f64, f64)]) -> f64 {
    let mut total = 0.0;
    let mut previous = points[0].1;
    let mut previous_up = true;

    for (i, &(_, current)) in points.iter().enumerate().skip(1) {
        if current < previous {
            previous_up = false;
            if i == points.len() - 1 {
                // reset on the last sample
                total += current;
            }
        } else {
            if previous_up {
                total += current - previous;
            } else {
                total += current;
            }
            previous_up = true;
        }
        previous = current;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(op: &str, points: &[(f64, f64)]) -> TileModel {
        SeriesAggregator
            .aggregate(op, &RawSeries::new("s", points.iter().copied()))
            .unwrap()
    }

    fn value(op: &str, points: &[(f64, f64)]) -> f64 {
        agg(op, points).value
    }

    const SAMPLE: &[(f64, f64)] = &[(0.0, 5.0), (10.0, 9.0), (20.0, 1.0), (30.0, 4.0)];

    #[test]
    fn test_basic_operators() {
        assert_eq!(value("avg", SAMPLE), 4.75);
        assert_eq!(value("count", SAMPLE), 4.0);
        assert_eq!(value("current", SAMPLE), 4.0);
        assert_eq!(value("first", SAMPLE), 5.0);
        assert_eq!(value("diff", SAMPLE), -1.0);
        assert_eq!(value("max", SAMPLE), 9.0);
        assert_eq!(value("min", SAMPLE), 1.0);
        assert_eq!(value("total", SAMPLE), 19.0);
        assert_eq!(value("last_time", SAMPLE), 30.0);
        assert_eq!(value("time_step", SAMPLE), 10.0);
    }

    #[test]
    fn test_logmin_ignores_non_positive() {
        assert_eq!(value("logmin", &[(0.0, 0.0), (1.0, -3.0), (2.0, 0.5), (3.0, 2.0)]), 0.5);
        assert!(value("logmin", &[(0.0, 0.0)]).is_nan());
    }

    #[test]
    fn test_delta_counter_reset() {
        // 1 -> 4 (+3), reset to 2, 2 -> 5 (+3 after reset adds 5)
        assert_eq!(value("delta", &[(0.0, 1.0), (1.0, 4.0), (2.0, 2.0), (3.0, 5.0)]), 8.0);
        // reset on the final sample counts the new value
        assert_eq!(value("delta", &[(0.0, 1.0), (1.0, 4.0), (2.0, 2.0)]), 5.0);
        assert_eq!(value("delta", &[(0.0, 1.0), (1.0, 2.0), (2.0, 6.0)]), 5.0);
    }

    #[test]
    fn test_delta_consecutive_drops() {
        // every drop is a reset; only the final one counts its value
        assert_eq!(value("delta", &[(0.0, 10.0), (1.0, 5.0), (2.0, 3.0), (3.0, 2.0)]), 2.0);
        assert_eq!(value("delta", &[(0.0, 10.0), (1.0, 5.0), (2.0, 3.0), (3.0, 4.0)]), 4.0);
    }

    #[test]
    fn test_time_step_is_smallest_interval() {
        assert_eq!(value("time_step", &[(0.0, 1.0), (10.0, 1.0), (100.0, 1.0)]), 10.0);
        assert_eq!(value("time_step", &[(0.0, 1.0), (90.0, 1.0), (95.0, 1.0)]), 5.0);
        assert!(value("time_step", &[(0.0, 1.0)]).is_nan());
    }

    #[test]
    fn test_empty_series_is_nan_and_untriggered() {
        for op in Operator::ALL {
            let tile = agg(op.as_str(), &[]);
            assert!(tile.value.is_nan(), "{op} should be NaN on empty input");
            assert_eq!(tile.threshold_level, 0);
            assert_eq!(tile.timestamp, None);
        }
    }

    #[test]
    fn test_name_operator_sets_text() {
        let tile = agg("name", SAMPLE);
        assert!(tile.value.is_nan());
        assert_eq!(tile.value_formatted.as_deref(), Some("s"));
    }

    #[test]
    fn test_unknown_operator_is_configuration_error() {
        let err = SeriesAggregator
            .aggregate("median", &RawSeries::new("svc", [(0.0, 1.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownOperator {
                operator: "median".to_string(),
                series: "svc".to_string(),
            }
        );
    }

    #[test]
    fn test_nan_samples_are_skipped() {
        assert_eq!(value("avg", &[(0.0, 2.0), (1.0, f64::NAN), (2.0, 4.0)]), 3.0);
    }

    #[test]
    fn test_operator_round_trips_names() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>(), Ok(op));
        }
    }
}
