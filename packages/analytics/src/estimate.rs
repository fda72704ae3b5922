//! Population-proportional demographic case estimation.
//!
//! Distributes a region's total case count across demographic cells in
//! proportion to each cell's share of the demographic population. The
//! defining property is conservation: the allocations sum back to the
//! total being distributed.
//!
//! The region total population here is the sum of the demographic
//! table's own rows; the two population sources are independent and
//! must not be mixed.

use epi_map_analytics_models::{EstimateParams, EstimateResult};
use epi_map_database_models::DemographicPopulationRow;
use epi_map_epi_models::{CellEstimate, DemographicCell};
use switchy_database::Database;

use crate::{AnalyticsError, RATE_SCALE, effective_population_year, fetch};

/// Estimates cases per demographic cell for a region-disease-year, for
/// all cells or one named cell.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the region does not exist, a requested
/// cell has no population row (`NotFound`, distinct from a zero
/// population), or a query fails.
pub async fn estimate_cases(
    db: &dyn Database,
    edge_year: i32,
    params: &EstimateParams,
) -> Result<EstimateResult, AnalyticsError> {
    let region = fetch::resolve_region(db, &params.region_name).await?;
    let effective_year = effective_population_year(params.year, edge_year);

    let (total_cases, cells) = futures::try_join!(
        fetch::total_cases(db, Some(region.id), params.disease_id, params.year),
        fetch::demographic_populations(db, region.id, effective_year),
    )?;

    if let Some(target) = &params.cell
        && !cells.iter().any(|row| &row.cell == target)
    {
        return Err(AnalyticsError::NotFound {
            message: format!(
                "No population cell ({}, {}, {}) for {} in {effective_year}",
                target.race, target.sex, target.age_group, region.name
            ),
        });
    }

    let (total_population, mut estimates) = build_cell_estimates(total_cases, cells);

    if let Some(target) = &params.cell {
        estimates.retain(|estimate| &estimate.cell == target);
    }

    estimates.sort_by(|a, b| {
        b.estimated_cases
            .partial_cmp(&a.estimated_cases)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    #[allow(clippy::cast_sign_loss)]
    Ok(EstimateResult {
        total_cases: total_cases.max(0) as u64,
        total_population,
        estimates,
        description: describe(&region.name, params.year, params.cell.as_ref()),
    })
}

fn describe(region_name: &str, year: i32, cell: Option<&DemographicCell>) -> String {
    cell.map_or_else(
        || format!("Estimated cases by demographic cell for {region_name}, {year}"),
        |cell| {
            format!(
                "Estimated cases for ({}, {}, {}) in {region_name}, {year}",
                cell.race, cell.sex, cell.age_group
            )
        },
    )
}

/// Allocates `total` across `weights` proportionally.
///
/// The allocations sum to `total` (up to floating-point error). A
/// non-positive weight sum allocates zero everywhere, never an
/// undefined share.
pub(crate) fn allocate(total: i64, weights: &[i64]) -> Vec<f64> {
    let weight_sum: i64 = weights.iter().map(|w| (*w).max(0)).sum();
    if weight_sum <= 0 || total <= 0 {
        return vec![0.0; weights.len()];
    }

    #[allow(clippy::cast_precision_loss)]
    weights
        .iter()
        .map(|w| (*w).max(0) as f64 / weight_sum as f64 * total as f64)
        .collect()
}

/// Builds per-cell estimates from the raw demographic rows.
///
/// Returns the summed demographic population alongside the estimates.
/// A cell with zero population gets zero estimated cases and an
/// undefined per-capita rate.
pub(crate) fn build_cell_estimates(
    total_cases: i64,
    cells: Vec<DemographicPopulationRow>,
) -> (u64, Vec<CellEstimate>) {
    let weights: Vec<i64> = cells.iter().map(|row| row.population).collect();
    let allocated = allocate(total_cases, &weights);

    let total_population: i64 = weights.iter().map(|w| (*w).max(0)).sum();

    let estimates = cells
        .into_iter()
        .zip(allocated)
        .map(|(row, estimated_cases)| {
            #[allow(clippy::cast_precision_loss)]
            let cases_per_100k = if row.population > 0 {
                Some(estimated_cases / row.population as f64 * RATE_SCALE)
            } else {
                None
            };

            #[allow(clippy::cast_sign_loss)]
            CellEstimate {
                cell: row.cell,
                population: row.population.max(0) as u64,
                estimated_cases,
                cases_per_100k,
            }
        })
        .collect();

    #[allow(clippy::cast_sign_loss)]
    (total_population.max(0) as u64, estimates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(race: &str, sex: &str, age_group: &str, population: i64) -> DemographicPopulationRow {
        DemographicPopulationRow {
            cell: DemographicCell {
                race: race.to_string(),
                sex: sex.to_string(),
                age_group: age_group.to_string(),
            },
            population,
        }
    }

    #[test]
    fn allocations_sum_back_to_the_total() {
        // A partition that doesn't divide evenly.
        let cells = vec![
            cell("White", "Female", "0-17", 3),
            cell("White", "Male", "0-17", 3),
            cell("Black", "Female", "0-17", 3),
        ];
        let (_, estimates) = build_cell_estimates(100, cells);

        let sum: f64 = estimates.iter().map(|e| e.estimated_cases).sum();
        assert!((sum - 100.0).abs() / 100.0 < 1e-6);
    }

    #[test]
    fn allocation_follows_population_share() {
        let cells = vec![
            cell("White", "Female", "18-64", 60),
            cell("White", "Male", "18-64", 40),
        ];
        let (total_population, estimates) = build_cell_estimates(100, cells);

        assert_eq!(total_population, 100);
        assert!((estimates[0].estimated_cases - 60.0).abs() < 1e-9);
        assert!((estimates[1].estimated_cases - 40.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_population_allocates_zero_everywhere() {
        let cells = vec![
            cell("White", "Female", "65+", 0),
            cell("White", "Male", "65+", 0),
        ];
        let (total_population, estimates) = build_cell_estimates(100, cells);

        assert_eq!(total_population, 0);
        assert!(estimates.iter().all(|e| e.estimated_cases == 0.0));
        assert!(estimates.iter().all(|e| e.cases_per_100k.is_none()));
    }

    #[test]
    fn missing_case_data_estimates_zero() {
        let cells = vec![cell("White", "Female", "0-17", 500)];
        let (_, estimates) = build_cell_estimates(0, cells);

        assert!(estimates[0].estimated_cases.abs() < f64::EPSILON);
    }

    #[test]
    fn derived_rate_uses_cell_population() {
        let cells = vec![
            cell("White", "Female", "0-17", 50_000),
            cell("White", "Male", "0-17", 50_000),
        ];
        let (_, estimates) = build_cell_estimates(200, cells);

        // 100 estimated cases over 50,000 residents = 200 per 100k.
        assert!((estimates[0].cases_per_100k.unwrap() - 200.0).abs() < 1e-9);
    }
}
