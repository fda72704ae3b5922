#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical aggregation engine over the epi-map star schema.
//!
//! Each public module implements one analytical operation: an async
//! function that runs parameterized SQL against the star schema, then
//! feeds the rows through pure computation functions where the
//! statistical semantics live. The pure functions are unit-tested
//! without a database.
//!
//! Every operation is stateless and independent: no module calls
//! another's operation, and unrelated invocations may run in parallel.
//! Where one operation needs several independent sub-queries they are
//! issued concurrently and joined before the combination step.

pub mod compare;
pub mod deaths;
pub mod estimate;
pub mod exposure;
pub mod outliers;
pub mod rates;
pub mod trends;
pub mod window;

mod fetch;

use epi_map_epi_models::RegionRate;
use thiserror::Error;

/// Scale factor for per-capita rates: cases per 100,000 residents.
pub const RATE_SCALE: f64 = 100_000.0;

/// Width of the trailing weekly window, in weeks.
pub const WINDOW_WEEKS: i32 = 52;

/// Required span of the rising-trend year window (`endYear - startYear`).
pub const TREND_SPAN_YEARS: i32 = 3;

/// Errors that can occur during analytical operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Request parameters failed validation before any query ran.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what was rejected.
        message: String,
    },

    /// A named region, disease, or demographic cell has no matching row.
    /// Distinct from a combination that exists with a zero value.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Resolves the population year to join against for a requested year.
///
/// Population data exists only through a bounded edge year; any request
/// beyond the edge substitutes the latest available year. Every
/// population lookup in this crate goes through this one function so the
/// fallback cannot drift between operations.
#[must_use]
pub const fn effective_population_year(requested: i32, edge_year: i32) -> i32 {
    if requested < edge_year {
        requested
    } else {
        edge_year
    }
}

/// Computes cases per 100,000 residents.
///
/// Returns `None` for a zero or negative denominator. An undefined rate
/// is a data condition, never an arithmetic fault.
#[must_use]
pub fn per_capita_rate(cases: i64, population: i64) -> Option<f64> {
    if population <= 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(cases as f64 / population as f64 * RATE_SCALE)
}

/// Sorts region rates descending, with undefined rates after every
/// defined rate. Regions that are both undefined fall back to comparing
/// raw case counts.
pub(crate) fn sort_rates_descending(rates: &mut [RegionRate]) {
    rates.sort_by(|a, b| match (a.cases_per_100k, b.cases_per_100k) {
        (Some(a_rate), Some(b_rate)) => b_rate
            .partial_cmp(&a_rate)
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.total_cases.cmp(&a.total_cases),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_year_passes_through_below_edge() {
        assert_eq!(effective_population_year(2020, 2023), 2020);
        assert_eq!(effective_population_year(2023, 2023), 2023);
    }

    #[test]
    fn effective_year_clamps_beyond_edge() {
        assert_eq!(effective_population_year(2024, 2023), 2023);
        assert_eq!(effective_population_year(2030, 2023), 2023);
    }

    #[test]
    fn rate_is_scaled_per_100k() {
        let rate = per_capita_rate(500, 1_000_000).unwrap();
        assert!((rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rate_is_non_negative_for_valid_inputs() {
        assert!(per_capita_rate(0, 1).unwrap() >= 0.0);
        assert!(per_capita_rate(123, 456).unwrap() >= 0.0);
    }

    #[test]
    fn zero_population_yields_undefined_rate() {
        assert_eq!(per_capita_rate(10, 0), None);
    }

    #[test]
    fn undefined_rates_sort_last() {
        let mut rates = vec![
            region_rate(1, "A", 5, None, None),
            region_rate(2, "B", 10, Some(200), Some(5000.0)),
            region_rate(3, "C", 10, Some(100), Some(10_000.0)),
        ];
        sort_rates_descending(&mut rates);
        let names: Vec<&str> = rates.iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    fn region_rate(
        region_id: i32,
        name: &str,
        total_cases: u64,
        population: Option<u64>,
        cases_per_100k: Option<f64>,
    ) -> RegionRate {
        RegionRate {
            region_id,
            region_name: name.to_string(),
            total_cases,
            population,
            cases_per_100k,
        }
    }
}
