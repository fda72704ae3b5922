//! Demographic over/under-exposure analysis.
//!
//! For each value of a chosen demographic dimension, compares the
//! group's share of attributed cases against its share of the region's
//! demographic population. The case attribution reuses the proportional
//! allocation kernel, weighted by the disease's observed death
//! distribution for that dimension.
//!
//! Shares are rounded to four decimal places only at the output
//! boundary; the sum invariants (shares to 1, exposures to 0) hold on
//! the unrounded values.

use std::collections::BTreeMap;

use epi_map_analytics_models::{ExposureParams, ExposureResult};
use epi_map_epi_models::GroupExposure;
use switchy_database::Database;

use crate::{AnalyticsError, effective_population_year, estimate::allocate, fetch};

/// Computes per-group over/under-exposure for a region-disease-year
/// along one demographic dimension.
///
/// The three inputs (total cases, group populations, attribution
/// weights) are independent and fetched concurrently.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the region does not exist or a query
/// fails.
pub async fn exposure_breakdown(
    db: &dyn Database,
    edge_year: i32,
    params: &ExposureParams,
) -> Result<ExposureResult, AnalyticsError> {
    let region = fetch::resolve_region(db, &params.region_name).await?;
    let effective_year = effective_population_year(params.year, edge_year);

    let (total_cases, group_pops, case_weights) = futures::try_join!(
        fetch::total_cases(db, Some(region.id), params.disease_id, params.year),
        fetch::group_populations(db, region.id, effective_year, params.dimension),
        fetch::death_weights(db, params.disease_id, params.year, params.dimension),
    )?;

    let groups = compute_exposure(total_cases, &group_pops, &case_weights);

    let total_population: i64 = group_pops.iter().map(|(_, p)| (*p).max(0)).sum();

    #[allow(clippy::cast_sign_loss)]
    Ok(ExposureResult {
        groups,
        total_cases: total_cases.max(0) as u64,
        total_population: total_population.max(0) as u64,
        description: format!(
            "Share of cases vs share of population by {} for {}, {}",
            params.dimension, region.name, params.year
        ),
    })
}

/// Computes shares and exposures over the union of group keys.
///
/// `populations` carries each group's population; `case_weights`
/// carries the observed attribution signal the total case count is
/// allocated by. Zero totals on either side produce zero shares, never
/// NaN. Output is sorted descending by exposure.
#[must_use]
pub fn compute_exposure(
    total_cases: i64,
    populations: &[(String, i64)],
    case_weights: &[(String, i64)],
) -> Vec<GroupExposure> {
    // Union of group keys, ordered for stable output.
    let mut keys: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for (value, population) in populations {
        keys.entry(value.clone()).or_insert((0, 0)).0 = (*population).max(0);
    }
    for (value, weight) in case_weights {
        keys.entry(value.clone()).or_insert((0, 0)).1 = (*weight).max(0);
    }

    let total_population: i64 = keys.values().map(|(population, _)| population).sum();
    let weights: Vec<i64> = keys.values().map(|(_, weight)| *weight).collect();
    let allocated = allocate(total_cases, &weights);

    #[allow(clippy::cast_precision_loss)]
    let unrounded: Vec<(String, i64, f64, f64, f64)> = keys
        .into_iter()
        .zip(allocated)
        .map(|((value, (population, _)), estimated_cases)| {
            let share_of_population = if total_population > 0 {
                population as f64 / total_population as f64
            } else {
                0.0
            };
            let share_of_cases = if total_cases > 0 {
                estimated_cases / total_cases as f64
            } else {
                0.0
            };
            (
                value,
                population,
                estimated_cases,
                share_of_cases,
                share_of_population,
            )
        })
        .collect();

    // Sum invariants hold before rounding: shares to 1 on each side
    // (when anything was distributed on that side), exposures to 0.
    debug_assert!({
        let case_share_sum: f64 = unrounded.iter().map(|(_, _, _, c, _)| c).sum();
        let pop_share_sum: f64 = unrounded.iter().map(|(_, _, _, _, p)| p).sum();
        let has_weights = weights.iter().any(|w| *w > 0);
        (total_cases <= 0 || !has_weights || (case_share_sum - 1.0).abs() < 1e-9)
            && (total_population <= 0 || (pop_share_sum - 1.0).abs() < 1e-9)
    });

    let mut groups: Vec<GroupExposure> = unrounded
        .into_iter()
        .map(
            |(value, population, estimated_cases, share_of_cases, share_of_population)| {
                #[allow(clippy::cast_sign_loss)]
                GroupExposure {
                    value,
                    population: population.max(0) as u64,
                    share_of_population: round4(share_of_population),
                    estimated_cases,
                    share_of_cases: round4(share_of_cases),
                    over_under_exposure: round4(share_of_cases - share_of_population),
                }
            },
        )
        .collect();

    groups.sort_by(|a, b| {
        b.over_under_exposure
            .partial_cmp(&a.over_under_exposure)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    groups
}

/// Rounds to four decimal places for the output boundary.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, i64)]) -> Vec<(String, i64)> {
        entries
            .iter()
            .map(|(value, count)| ((*value).to_string(), *count))
            .collect()
    }

    #[test]
    fn two_group_example_matches_expected_shares() {
        // Populations [60, 40], cases [70, 30] of a total of 100.
        let groups = compute_exposure(
            100,
            &pairs(&[("A", 60), ("B", 40)]),
            &pairs(&[("A", 70), ("B", 30)]),
        );

        let a = groups.iter().find(|g| g.value == "A").unwrap();
        let b = groups.iter().find(|g| g.value == "B").unwrap();

        assert!((a.share_of_population - 0.60).abs() < 1e-12);
        assert!((b.share_of_population - 0.40).abs() < 1e-12);
        assert!((a.share_of_cases - 0.70).abs() < 1e-12);
        assert!((b.share_of_cases - 0.30).abs() < 1e-12);
        assert!((a.over_under_exposure - 0.10).abs() < 1e-12);
        assert!((b.over_under_exposure + 0.10).abs() < 1e-12);
    }

    #[test]
    fn exposures_sum_to_zero() {
        let groups = compute_exposure(
            977,
            &pairs(&[("A", 123_456), ("B", 654_321), ("C", 7_890)]),
            &pairs(&[("A", 400), ("B", 500), ("C", 77)]),
        );

        let exposure_sum: f64 = groups.iter().map(|g| g.over_under_exposure).sum();
        assert!(exposure_sum.abs() < 1e-3);

        let case_share_sum: f64 = groups.iter().map(|g| g.share_of_cases).sum();
        let pop_share_sum: f64 = groups.iter().map(|g| g.share_of_population).sum();
        assert!((case_share_sum - 1.0).abs() < 1e-3);
        assert!((pop_share_sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn zero_total_cases_produces_zero_case_shares() {
        let groups = compute_exposure(0, &pairs(&[("A", 60), ("B", 40)]), &pairs(&[]));

        for group in &groups {
            assert!(group.share_of_cases.abs() < f64::EPSILON);
            assert!(group.share_of_cases.is_finite());
            assert!(group.over_under_exposure.is_finite());
        }
        // Exposure degrades to -shareOfPopulation, still defined.
        let a = groups.iter().find(|g| g.value == "A").unwrap();
        assert!((a.over_under_exposure + 0.6).abs() < 1e-12);
    }

    #[test]
    fn zero_total_population_produces_zero_population_shares() {
        let groups = compute_exposure(
            100,
            &pairs(&[("A", 0), ("B", 0)]),
            &pairs(&[("A", 50), ("B", 50)]),
        );

        for group in &groups {
            assert!(group.share_of_population.abs() < f64::EPSILON);
            assert!(group.over_under_exposure.is_finite());
        }
    }

    #[test]
    fn missing_attribution_signal_produces_zero_case_shares() {
        // Cases exist but nothing to weight the attribution by.
        let groups = compute_exposure(100, &pairs(&[("A", 60), ("B", 40)]), &pairs(&[]));

        for group in &groups {
            assert!(group.share_of_cases.abs() < f64::EPSILON);
            assert!(group.estimated_cases.abs() < f64::EPSILON);
            assert!(group.over_under_exposure.is_finite());
        }
    }

    #[test]
    fn groups_missing_on_one_side_are_still_reported() {
        let groups = compute_exposure(
            10,
            &pairs(&[("A", 100)]),
            &pairs(&[("B", 10)]),
        );

        let a = groups.iter().find(|g| g.value == "A").unwrap();
        let b = groups.iter().find(|g| g.value == "B").unwrap();

        assert!((a.share_of_population - 1.0).abs() < 1e-12);
        assert!(a.share_of_cases.abs() < f64::EPSILON);
        assert_eq!(b.population, 0);
        assert!((b.share_of_cases - 1.0).abs() < 1e-12);
    }

    #[test]
    fn output_is_rounded_to_four_decimals() {
        let groups = compute_exposure(
            3,
            &pairs(&[("A", 1), ("B", 2)]),
            &pairs(&[("A", 1), ("B", 2)]),
        );

        for group in &groups {
            let scaled = group.share_of_population * 10_000.0;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
    }
}
