//! Aggregations behind the histogram and statistics pages.
//!
//! Both work on raw [`PollutantSample`]s. Values are coerced to numbers
//! first; anything that is not a finite number is left out of every
//! computation rather than failing the page.

mod window;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::storage::{CellValue, Database, PollutantSample};

pub use window::{DateWindow, TIMESTAMP_FORMAT};

/// Mean value of one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantAverage {
    /// Pollutant name.
    pub pollutant: String,
    /// Arithmetic mean of its numeric values.
    pub mean: f64,
}

/// Descriptive statistics of one pollutant, rounded to two decimals.
///
/// All four are `None` without numeric values; `std_dev` is also `None`
/// with fewer than two.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantStats {
    /// Pollutant name.
    pub pollutant: String,
    /// Number of numeric values aggregated.
    pub count: usize,
    /// Mean.
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std_dev: Option<f64>,
    /// Minimum.
    pub min: Option<f64>,
    /// Maximum.
    pub max: Option<f64>,
}

/// Read a measurement value as a finite number.
///
/// # Errors
///
/// Returns [`Error::ValueCoercion`] for nulls, non-numeric text and
/// non-finite numbers.
pub fn coerce_numeric(value: &CellValue) -> Result<f64> {
    let number = match value {
        #[allow(clippy::cast_precision_loss)]
        CellValue::Integer(i) => *i as f64,
        CellValue::Real(r) => *r,
        CellValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::value_coercion(s.as_str()))?,
        CellValue::Null => return Err(Error::value_coercion("NULL")),
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(Error::value_coercion(value.to_string()))
    }
}

/// Numeric values grouped by pollutant name, in name order.
///
/// Pollutants whose values are all missing keep an empty group.
#[must_use]
pub fn group_numeric(samples: &[PollutantSample]) -> BTreeMap<&str, Vec<f64>> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        let values = groups.entry(sample.pollutant.as_str()).or_default();
        match coerce_numeric(&sample.value) {
            Ok(v) => values.push(v),
            Err(e) => trace!("Skipping {} sample: {}", sample.pollutant, e),
        }
    }
    groups
}

/// Per-pollutant means of `samples`, by ascending mean.
///
/// Pollutants without any numeric value are omitted.
#[must_use]
pub fn mean_by_pollutant(samples: &[PollutantSample]) -> Vec<PollutantAverage> {
    let mut averages: Vec<PollutantAverage> = group_numeric(samples)
        .into_iter()
        .filter_map(|(pollutant, values)| {
            mean(&values).map(|mean| PollutantAverage {
                pollutant: pollutant.to_string(),
                mean,
            })
        })
        .collect();

    averages.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    averages
}

/// Average of every pollutant measured inside `window`, optionally in one
/// zone, by ascending mean.
///
/// # Errors
///
/// Returns an error if the samples cannot be read from the database.
pub fn average_by_pollutant(
    db: &Database,
    zone_id: Option<i64>,
    window: &DateWindow,
) -> Result<Vec<PollutantAverage>> {
    let samples = db.pollutant_samples(zone_id, window)?;
    Ok(mean_by_pollutant(&samples))
}

/// Mean, sample standard deviation, min and max per pollutant, by name.
#[must_use]
pub fn descriptive_stats(samples: &[PollutantSample]) -> Vec<PollutantStats> {
    group_numeric(samples)
        .into_iter()
        .map(|(pollutant, values)| {
            let min = values.iter().copied().reduce(f64::min);
            let max = values.iter().copied().reduce(f64::max);
            PollutantStats {
                pollutant: pollutant.to_string(),
                count: values.len(),
                mean: mean(&values).map(round2),
                std_dev: sample_std_dev(&values).map(round2),
                min: min.map(round2),
                max: max.map(round2),
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::sample_database;

    fn sample(pollutant: &str, value: CellValue) -> PollutantSample {
        PollutantSample::new(pollutant, value)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&CellValue::Integer(3)).unwrap(), 3.0);
        assert_eq!(coerce_numeric(&CellValue::Real(2.5)).unwrap(), 2.5);
        assert_eq!(coerce_numeric(&text(" 4.25 ")).unwrap(), 4.25);
        assert_eq!(coerce_numeric(&text("-1e2")).unwrap(), -100.0);
    }

    #[test]
    fn test_coerce_numeric_rejects() {
        for value in [
            CellValue::Null,
            text("x"),
            text(""),
            text("NaN"),
            text("inf"),
            CellValue::Real(f64::NAN),
        ] {
            let err = coerce_numeric(&value).unwrap_err();
            assert!(matches!(err, Error::ValueCoercion { .. }), "{value:?}");
        }
    }

    #[test]
    fn test_descriptive_stats_skips_non_numeric() {
        let samples = vec![
            sample("NO2", CellValue::Integer(1)),
            sample("NO2", CellValue::Integer(2)),
            sample("NO2", text("x")),
            sample("NO2", CellValue::Integer(3)),
        ];

        let stats = descriptive_stats(&samples);
        assert_eq!(stats.len(), 1);
        let no2 = &stats[0];
        assert_eq!(no2.count, 3);
        assert_eq!(no2.mean, Some(2.0));
        assert_eq!(no2.std_dev, Some(1.0));
        assert_eq!(no2.min, Some(1.0));
        assert_eq!(no2.max, Some(3.0));
    }

    #[test]
    fn test_descriptive_stats_rounds_to_two_decimals() {
        let samples = vec![
            sample("PM10", CellValue::Real(1.0)),
            sample("PM10", CellValue::Real(2.0)),
            sample("PM10", CellValue::Real(2.0)),
        ];

        let stats = &descriptive_stats(&samples)[0];
        // mean 1.6667, std 0.57735
        assert_eq!(stats.mean, Some(1.67));
        assert_eq!(stats.std_dev, Some(0.58));
    }

    #[test]
    fn test_descriptive_stats_single_value_has_no_std_dev() {
        let stats = descriptive_stats(&[sample("O3", CellValue::Real(60.0))]);
        assert_eq!(stats[0].mean, Some(60.0));
        assert_eq!(stats[0].std_dev, None);
        assert_eq!(stats[0].min, Some(60.0));
    }

    #[test]
    fn test_descriptive_stats_all_missing() {
        let stats = descriptive_stats(&[
            sample("SO2", CellValue::Null),
            sample("SO2", text("n/a")),
        ]);
        assert_eq!(
            stats,
            [PollutantStats {
                pollutant: "SO2".to_string(),
                count: 0,
                mean: None,
                std_dev: None,
                min: None,
                max: None,
            }]
        );
    }

    #[test]
    fn test_descriptive_stats_sorted_by_pollutant() {
        let stats = descriptive_stats(&[
            sample("PM10", CellValue::Integer(1)),
            sample("NO2", CellValue::Integer(1)),
            sample("O3", CellValue::Integer(1)),
        ]);
        let names: Vec<_> = stats.iter().map(|s| s.pollutant.as_str()).collect();
        assert_eq!(names, ["NO2", "O3", "PM10"]);
    }

    #[test]
    fn test_descriptive_stats_empty() {
        assert!(descriptive_stats(&[]).is_empty());
    }

    #[test]
    fn test_mean_by_pollutant_orders_by_mean() {
        let samples = vec![
            sample("PM10", CellValue::Real(30.0)),
            sample("NO2", CellValue::Real(12.0)),
            sample("O3", CellValue::Real(5.0)),
            sample("NO2", CellValue::Real(8.0)),
            sample("PM10", text("x")),
        ];

        let averages = mean_by_pollutant(&samples);
        let rows: Vec<_> = averages
            .iter()
            .map(|a| (a.pollutant.as_str(), a.mean))
            .collect();
        assert_eq!(rows, [("O3", 5.0), ("NO2", 10.0), ("PM10", 30.0)]);
    }

    #[test]
    fn test_mean_by_pollutant_drops_all_missing() {
        let averages = mean_by_pollutant(&[sample("SO2", CellValue::Null)]);
        assert!(averages.is_empty());
    }

    #[test]
    fn test_average_by_pollutant_one_zone() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 1, 1, 31).unwrap();

        let averages = average_by_pollutant(&db, Some(1), &window).unwrap();
        // NO2: 12.5, 8, 15 ; PM10: 30, 22, 41
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].pollutant, "NO2");
        assert!((averages[0].mean - 35.5 / 3.0).abs() < 1e-9);
        assert_eq!(averages[1].pollutant, "PM10");
        assert!((averages[1].mean - 31.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_by_pollutant_all_zones_ignores_bad_values() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 1, 1, 1).unwrap();

        let averages = average_by_pollutant(&db, None, &window).unwrap();
        let rows: Vec<_> = averages
            .iter()
            .map(|a| (a.pollutant.as_str(), a.mean))
            .collect();
        // NO2: 12.5 and 20 ('x' skipped) ; PM10: 30 (NULL skipped) ; O3: 60
        assert_eq!(rows, [("NO2", 16.25), ("PM10", 30.0), ("O3", 60.0)]);
    }

    #[test]
    fn test_average_by_pollutant_empty_window() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 3, 1, 31).unwrap();

        assert!(average_by_pollutant(&db, None, &window).unwrap().is_empty());
        assert!(average_by_pollutant(&db, Some(1), &window)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_average_by_pollutant_zone_without_sites() {
        let (_dir, db) = sample_database();
        let window = DateWindow::month_days(2023, 1, 1, 31).unwrap();

        assert!(average_by_pollutant(&db, Some(3), &window)
            .unwrap()
            .is_empty());
    }
}
