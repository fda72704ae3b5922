//! Region-vs-national rate comparison over a year range.
//!
//! Produces one point per year with the region's rate and the national
//! rate side by side. The national rate is sum-then-divide: summed
//! cases over summed population across all regions, never the average
//! of per-region rates. Years without observations carry a 0.0 rate so
//! the series has no gaps.

use std::collections::HashMap;

use epi_map_analytics_models::{CompareParams, CompareResult};
use epi_map_epi_models::RateComparisonPoint;
use switchy_database::Database;

use crate::{AnalyticsError, effective_population_year, fetch, per_capita_rate};

/// Computes parallel region and national rate series over
/// `[startYear, endYear]`.
///
/// The four sub-queries (region cases, national cases, region
/// populations, national populations) are independent and issued
/// concurrently; the series is assembled only once all four complete.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the year range is invalid, the region
/// does not exist, or a query fails.
pub async fn compare_region_to_national(
    db: &dyn Database,
    edge_year: i32,
    params: &CompareParams,
) -> Result<CompareResult, AnalyticsError> {
    if params.end_year < params.start_year {
        return Err(AnalyticsError::Validation {
            message: format!(
                "endYear must be >= startYear, got {} and {}",
                params.start_year, params.end_year
            ),
        });
    }

    let region = fetch::resolve_region(db, &params.region_name).await?;

    let effective_years: Vec<i32> = {
        let mut years: Vec<i32> = (params.start_year..=params.end_year)
            .map(|year| effective_population_year(year, edge_year))
            .collect();
        years.dedup();
        years
    };

    let (region_cases, national_cases, region_populations, national_populations) = futures::try_join!(
        fetch::year_case_sums(
            db,
            Some(region.id),
            params.disease_id,
            params.start_year,
            params.end_year,
        ),
        fetch::year_case_sums(db, None, params.disease_id, params.start_year, params.end_year),
        fetch::region_populations_for_years(db, region.id, &effective_years),
        fetch::national_populations_for_years(db, &effective_years),
    )?;

    let series = build_comparison_series(
        params.start_year,
        params.end_year,
        edge_year,
        &region_cases,
        &national_cases,
        &region_populations,
        &national_populations,
    );

    Ok(CompareResult {
        series,
        description: format!(
            "{} vs national cases per 100k, {}-{}",
            region.name, params.start_year, params.end_year
        ),
    })
}

/// Assembles one comparison point per year, filling gaps with 0.0.
///
/// Population maps are keyed by effective (fallback-resolved) year;
/// case maps by requested year.
pub(crate) fn build_comparison_series(
    start_year: i32,
    end_year: i32,
    edge_year: i32,
    region_cases: &HashMap<i32, i64>,
    national_cases: &HashMap<i32, i64>,
    region_populations: &HashMap<i32, i64>,
    national_populations: &HashMap<i32, i64>,
) -> Vec<RateComparisonPoint> {
    (start_year..=end_year)
        .map(|year| {
            let effective = effective_population_year(year, edge_year);

            RateComparisonPoint {
                year,
                region_rate: rate_or_zero(
                    region_cases.get(&year),
                    region_populations.get(&effective),
                ),
                national_rate: rate_or_zero(
                    national_cases.get(&year),
                    national_populations.get(&effective),
                ),
            }
        })
        .collect()
}

/// Rate for one scope-year, defaulting to 0.0 when the year has no
/// observations or no usable denominator.
fn rate_or_zero(cases: Option<&i64>, population: Option<&i64>) -> f64 {
    match (cases, population) {
        (Some(&cases), Some(&population)) => per_capita_rate(cases, population).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_rate_is_sum_then_divide() {
        // Two regions: populations 100 and 300, 10 cases each.
        // National = 20 / 400 * 100k = 5000, NOT the average of the
        // per-region rates ((10000 + 3333.33) / 2 ~= 6666.67).
        let region_cases = HashMap::from([(2023, 10)]);
        let national_cases = HashMap::from([(2023, 20)]);
        let region_populations = HashMap::from([(2023, 100)]);
        let national_populations = HashMap::from([(2023, 400)]);

        let series = build_comparison_series(
            2023,
            2023,
            2023,
            &region_cases,
            &national_cases,
            &region_populations,
            &national_populations,
        );

        assert!((series[0].national_rate - 5000.0).abs() < 1e-9);
        assert!((series[0].national_rate - 6666.67).abs() > 1000.0);
        assert!((series[0].region_rate - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn every_year_in_range_gets_exactly_one_point() {
        let region_cases = HashMap::from([(2021, 5)]);
        let national_cases = HashMap::from([(2021, 5), (2023, 7)]);
        let populations = HashMap::from([(2020, 1000), (2021, 1000), (2022, 1000), (2023, 1000)]);

        let series = build_comparison_series(
            2020,
            2023,
            2023,
            &region_cases,
            &national_cases,
            &populations,
            &populations,
        );

        assert_eq!(series.len(), 4);
        let years: Vec<i32> = series.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2020, 2021, 2022, 2023]);
    }

    #[test]
    fn missing_years_default_to_zero_not_null() {
        let region_cases = HashMap::new();
        let national_cases = HashMap::from([(2022, 40)]);
        let populations = HashMap::from([(2022, 100_000), (2023, 100_000)]);

        let series = build_comparison_series(
            2022,
            2023,
            2023,
            &region_cases,
            &national_cases,
            &populations,
            &populations,
        );

        assert!(series[0].region_rate.abs() < f64::EPSILON);
        assert!((series[0].national_rate - 40.0).abs() < 1e-9);
        assert!(series[1].region_rate.abs() < f64::EPSILON);
        assert!(series[1].national_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn years_beyond_the_edge_reuse_the_edge_population() {
        // Edge 2023: the 2024 point divides by the 2023 population, so
        // identical cases produce identical rates.
        let region_cases = HashMap::from([(2023, 500), (2024, 500)]);
        let national_cases = HashMap::from([(2023, 500), (2024, 500)]);
        let populations = HashMap::from([(2023, 1_000_000)]);

        let series = build_comparison_series(
            2023,
            2024,
            2023,
            &region_cases,
            &national_cases,
            &populations,
            &populations,
        );

        assert!((series[0].region_rate - 50.0).abs() < 1e-9);
        assert!((series[1].region_rate - 50.0).abs() < 1e-9);
        assert!((series[0].region_rate - series[1].region_rate).abs() < f64::EPSILON);
    }
}
