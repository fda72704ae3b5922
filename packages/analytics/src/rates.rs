//! Per-region per-capita rate ranking.
//!
//! Sums case counts per region for a disease scope, divides by the
//! year-fallback population, and ranks descending with undefined rates
//! last.

use std::collections::HashMap;

use epi_map_analytics_models::{RateRankingParams, RateRankingResult};
use epi_map_database_models::RegionCaseSum;
use epi_map_epi_models::RegionRate;
use switchy_database::Database;

use crate::{
    AnalyticsError, effective_population_year, fetch, per_capita_rate, sort_rates_descending,
};

/// Computes cases per 100,000 for every region in scope, descending by
/// rate with undefined rates last.
///
/// The case sum and the population lookup are independent and fetched
/// concurrently. The population year is the requested year clamped to
/// the fallback edge.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the parameters fail validation or a
/// query fails.
pub async fn rank_rates(
    db: &dyn Database,
    edge_year: i32,
    params: &RateRankingParams,
) -> Result<RateRankingResult, AnalyticsError> {
    if params.disease_ids.is_empty() {
        return Err(AnalyticsError::Validation {
            message: "At least one diseaseId is required".to_string(),
        });
    }

    if let Some(week) = params.week
        && !(1..=52).contains(&week)
    {
        return Err(AnalyticsError::Validation {
            message: format!("week must be within [1, 52], got {week}"),
        });
    }

    let effective_year = effective_population_year(params.year, edge_year);

    let (case_sums, populations) = futures::try_join!(
        fetch::case_sums_by_region(db, &params.disease_ids, params.year, params.week),
        fetch::population_by_region(db, effective_year),
    )?;

    let mut rates = build_region_rates(case_sums, &populations);
    sort_rates_descending(&mut rates);

    let scope = params.week.map_or_else(
        || format!("year {}", params.year),
        |week| format!("year {} week {week}", params.year),
    );

    log::debug!(
        "Ranked {} regions for {scope} (population year {effective_year})",
        rates.len()
    );

    Ok(RateRankingResult {
        rates,
        effective_population_year: effective_year,
        description: format!("Cases per 100k by region, {scope}"),
    })
}

/// Joins case sums with the population map into per-region rates.
///
/// A region missing from the population map, or with a zero population,
/// gets an undefined rate; its case sum is preserved either way.
pub(crate) fn build_region_rates(
    case_sums: Vec<RegionCaseSum>,
    populations: &HashMap<i32, i64>,
) -> Vec<RegionRate> {
    case_sums
        .into_iter()
        .map(|sum| {
            let population = populations.get(&sum.region_id).copied();
            let cases_per_100k = population.and_then(|p| per_capita_rate(sum.cases, p));

            #[allow(clippy::cast_sign_loss)]
            RegionRate {
                region_id: sum.region_id,
                region_name: sum.region_name,
                total_cases: sum.cases.max(0) as u64,
                population: population.map(|p| p.max(0) as u64),
                cases_per_100k,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums(entries: &[(i32, &str, i64)]) -> Vec<RegionCaseSum> {
        entries
            .iter()
            .map(|(region_id, name, cases)| RegionCaseSum {
                region_id: *region_id,
                region_name: (*name).to_string(),
                cases: *cases,
            })
            .collect()
    }

    #[test]
    fn computes_rate_per_100k() {
        let populations = HashMap::from([(1, 1_000_000)]);
        let rates = build_region_rates(sums(&[(1, "Avalon", 500)]), &populations);

        assert_eq!(rates.len(), 1);
        assert!((rates[0].cases_per_100k.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(rates[0].total_cases, 500);
        assert_eq!(rates[0].population, Some(1_000_000));
    }

    #[test]
    fn missing_population_yields_undefined_rate() {
        let populations = HashMap::new();
        let rates = build_region_rates(sums(&[(1, "Avalon", 500)]), &populations);

        assert_eq!(rates[0].population, None);
        assert_eq!(rates[0].cases_per_100k, None);
    }

    #[test]
    fn zero_population_yields_undefined_rate_with_population_present() {
        let populations = HashMap::from([(1, 0)]);
        let rates = build_region_rates(sums(&[(1, "Avalon", 500)]), &populations);

        // Population exists but is zero, distinguishable from a missing row.
        assert_eq!(rates[0].population, Some(0));
        assert_eq!(rates[0].cases_per_100k, None);
    }

    #[test]
    fn empty_scope_sums_to_zero_cases() {
        let populations = HashMap::from([(1, 10_000)]);
        let rates = build_region_rates(sums(&[(1, "Avalon", 0)]), &populations);

        assert_eq!(rates[0].total_cases, 0);
        assert!((rates[0].cases_per_100k.unwrap()).abs() < f64::EPSILON);
    }

    #[test]
    fn ranking_puts_undefined_rates_last() {
        let populations = HashMap::from([(1, 100), (2, 1000)]);
        let mut rates = build_region_rates(
            sums(&[(1, "Avalon", 10), (2, "Brighton", 10), (3, "Caldera", 99)]),
            &populations,
        );
        sort_rates_descending(&mut rates);

        let names: Vec<&str> = rates.iter().map(|r| r.region_name.as_str()).collect();
        assert_eq!(names, vec!["Avalon", "Brighton", "Caldera"]);
        assert_eq!(rates[2].cases_per_100k, None);
    }
}
