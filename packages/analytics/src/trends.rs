//! Rising-trend detection over a fixed four-year window.
//!
//! Finds regions whose per-capita rate is defined for every year of the
//! window and strictly increases year over year. A region missing any
//! year is filtered for incompleteness before the monotonicity check;
//! it is not treated as a failed comparison.

use std::collections::BTreeMap;
use std::collections::HashMap;

use epi_map_analytics_models::{RegionTrend, RisingTrendParams, RisingTrendResult, YearRate};
use epi_map_database_models::RegionYearCaseSum;
use switchy_database::Database;

use crate::{
    AnalyticsError, TREND_SPAN_YEARS, effective_population_year, fetch, per_capita_rate,
};

/// Finds regions with a complete, strictly increasing rate series
/// across `[startYear, endYear]`.
///
/// The span is a request-shape precondition: `endYear - startYear` must
/// equal the fixed window span, checked before any query runs.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the span is wrong or a query fails.
pub async fn rising_trends(
    db: &dyn Database,
    edge_year: i32,
    params: &RisingTrendParams,
) -> Result<RisingTrendResult, AnalyticsError> {
    validate_span(params.start_year, params.end_year)?;

    let effective_years: Vec<i32> = {
        let mut years: Vec<i32> = (params.start_year..=params.end_year)
            .map(|year| effective_population_year(year, edge_year))
            .collect();
        years.dedup();
        years
    };

    let (case_sums, populations) = futures::try_join!(
        fetch::region_year_case_sums(db, params.disease_id, params.start_year, params.end_year),
        fetch::populations_for_years(db, &effective_years),
    )?;

    let regions = find_rising(
        case_sums,
        &populations,
        edge_year,
        params.start_year,
        params.end_year,
    );

    Ok(RisingTrendResult {
        regions,
        description: format!(
            "Regions with strictly rising rates, {}-{}",
            params.start_year, params.end_year
        ),
    })
}

/// Rejects year ranges that don't span exactly the fixed window.
///
/// This is a request-shape error, caught before any query runs, not an
/// analytical edge case.
pub(crate) fn validate_span(start_year: i32, end_year: i32) -> Result<(), AnalyticsError> {
    if end_year - start_year == TREND_SPAN_YEARS {
        Ok(())
    } else {
        Err(AnalyticsError::Validation {
            message: format!(
                "endYear must equal startYear + {TREND_SPAN_YEARS}, got {start_year} and {end_year}"
            ),
        })
    }
}

/// Groups case sums by region, builds each region's rate series, and
/// keeps regions whose series is complete and strictly increasing.
pub(crate) fn find_rising(
    case_sums: Vec<RegionYearCaseSum>,
    populations: &HashMap<(i32, i32), i64>,
    edge_year: i32,
    start_year: i32,
    end_year: i32,
) -> Vec<RegionTrend> {
    // BTreeMap keeps the output ordered by region id.
    let mut by_region: BTreeMap<i32, (String, BTreeMap<i32, i64>)> = BTreeMap::new();

    for sum in case_sums {
        let entry = by_region
            .entry(sum.region_id)
            .or_insert_with(|| (sum.region_name.clone(), BTreeMap::new()));
        // Duplicate fact rows for the same region-year are summed.
        *entry.1.entry(sum.year).or_insert(0) += sum.cases;
    }

    let mut rising = Vec::new();

    'regions: for (region_id, (region_name, year_cases)) in by_region {
        let mut rates = Vec::new();
        let mut previous: Option<f64> = None;

        for year in start_year..=end_year {
            // Incomplete series: no observations for this year at all.
            let Some(&cases) = year_cases.get(&year) else {
                continue 'regions;
            };

            let effective = effective_population_year(year, edge_year);
            let population = populations.get(&(region_id, effective)).copied();

            // An undefined rate anywhere in the window also disqualifies.
            let Some(rate) = population.and_then(|p| per_capita_rate(cases, p)) else {
                continue 'regions;
            };

            if let Some(previous) = previous
                && rate <= previous
            {
                continue 'regions;
            }

            previous = Some(rate);
            rates.push(YearRate {
                year,
                cases_per_100k: rate,
            });
        }

        rising.push(RegionTrend {
            region_id,
            region_name,
            rates,
        });
    }

    rising
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums(region_id: i32, name: &str, years: &[(i32, i64)]) -> Vec<RegionYearCaseSum> {
        years
            .iter()
            .map(|(year, cases)| RegionYearCaseSum {
                region_id,
                region_name: name.to_string(),
                year: *year,
                cases: *cases,
            })
            .collect()
    }

    fn flat_populations(region_id: i32, years: &[i32], population: i64) -> HashMap<(i32, i32), i64> {
        years
            .iter()
            .map(|year| ((region_id, *year), population))
            .collect()
    }

    #[test]
    fn span_must_be_exactly_four_years() {
        assert!(validate_span(2020, 2023).is_ok());
        assert!(validate_span(2020, 2022).is_err());
        assert!(validate_span(2020, 2024).is_err());
        assert!(validate_span(2023, 2020).is_err());
    }

    #[test]
    fn strictly_rising_series_is_reported() {
        // Rates 10, 20, 30, 40 against a constant population.
        let case_sums = sums(1, "Avalon", &[(2020, 10), (2021, 20), (2022, 30), (2023, 40)]);
        let populations = flat_populations(1, &[2020, 2021, 2022, 2023], 100_000);

        let rising = find_rising(case_sums, &populations, 2023, 2020, 2023);

        assert_eq!(rising.len(), 1);
        assert_eq!(rising[0].region_name, "Avalon");
        let rates: Vec<f64> = rising[0].rates.iter().map(|r| r.cases_per_100k).collect();
        assert_eq!(rates, vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn equal_step_disqualifies() {
        let case_sums = sums(1, "Avalon", &[(2020, 10), (2021, 20), (2022, 20), (2023, 40)]);
        let populations = flat_populations(1, &[2020, 2021, 2022, 2023], 100_000);

        assert!(find_rising(case_sums, &populations, 2023, 2020, 2023).is_empty());
    }

    #[test]
    fn missing_year_excludes_region_regardless_of_shape() {
        // 10, 20, 30 but nothing for 2023: filtered for incompleteness.
        let case_sums = sums(1, "Avalon", &[(2020, 10), (2021, 20), (2022, 30)]);
        let populations = flat_populations(1, &[2020, 2021, 2022, 2023], 100_000);

        assert!(find_rising(case_sums, &populations, 2023, 2020, 2023).is_empty());
    }

    #[test]
    fn undefined_rate_in_window_excludes_region() {
        let case_sums = sums(1, "Avalon", &[(2020, 10), (2021, 20), (2022, 30), (2023, 40)]);
        // No population row for 2022.
        let populations = flat_populations(1, &[2020, 2021, 2023], 100_000);

        assert!(find_rising(case_sums, &populations, 2023, 2020, 2023).is_empty());
    }

    #[test]
    fn fallback_years_share_the_edge_population() {
        // Edge year 2021: 2022 and 2023 both use the 2021 population,
        // so rising case counts still produce a rising series.
        let case_sums = sums(1, "Avalon", &[(2020, 10), (2021, 20), (2022, 30), (2023, 40)]);
        let populations = flat_populations(1, &[2020, 2021], 100_000);

        let rising = find_rising(case_sums, &populations, 2021, 2020, 2023);
        assert_eq!(rising.len(), 1);
    }

    #[test]
    fn regions_are_independent() {
        let mut case_sums = sums(1, "Avalon", &[(2020, 10), (2021, 20), (2022, 30), (2023, 40)]);
        case_sums.extend(sums(2, "Brighton", &[(2020, 40), (2021, 30), (2022, 20), (2023, 10)]));

        let mut populations = flat_populations(1, &[2020, 2021, 2022, 2023], 100_000);
        populations.extend(flat_populations(2, &[2020, 2021, 2022, 2023], 100_000));

        let rising = find_rising(case_sums, &populations, 2023, 2020, 2023);
        assert_eq!(rising.len(), 1);
        assert_eq!(rising[0].region_name, "Avalon");
    }
}
