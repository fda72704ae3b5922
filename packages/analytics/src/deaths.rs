//! Demographic death-rate analysis.
//!
//! Computes deaths per 100,000 residents of one demographic group for a
//! disease-year, with a monthly breakdown. The group is addressed by a
//! dimension tag from the closed `DemographicDimension` enum plus an
//! exact value. A group with no population cell at all is a not-found
//! condition, distinct from a group whose population is zero.

use epi_map_analytics_models::{DeathRateParams, DeathRateResult};
use epi_map_database_models::DeathSumRow;
use epi_map_epi_models::MonthlyDeathPoint;
use switchy_database::Database;

use crate::{AnalyticsError, effective_population_year, fetch, per_capita_rate};

/// Computes the death rate for one demographic group.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] for an empty value,
/// [`AnalyticsError::NotFound`] when no population cell matches the
/// value, or [`AnalyticsError::Database`] if a query fails.
pub async fn death_rate(
    db: &dyn Database,
    edge_year: i32,
    params: &DeathRateParams,
) -> Result<DeathRateResult, AnalyticsError> {
    if params.value.trim().is_empty() {
        return Err(AnalyticsError::Validation {
            message: "A non-empty demographic value is required".to_string(),
        });
    }

    let effective_year = effective_population_year(params.year, edge_year);

    let (monthly_rows, population) = futures::try_join!(
        fetch::monthly_death_sums(
            db,
            params.disease_id,
            params.year,
            params.dimension,
            &params.value,
        ),
        fetch::group_population(db, effective_year, params.dimension, &params.value),
    )?;

    let Some(population) = population else {
        return Err(AnalyticsError::NotFound {
            message: format!(
                "No population cell where {} = '{}' in {effective_year}",
                params.dimension, params.value
            ),
        });
    };

    let (total_deaths, monthly) = build_monthly_breakdown(monthly_rows);

    #[allow(clippy::cast_sign_loss)]
    Ok(DeathRateResult {
        deaths: total_deaths as u64,
        population: population.max(0) as u64,
        deaths_per_100k: per_capita_rate(total_deaths, population),
        monthly,
        description: format!(
            "Deaths per 100k where {} = '{}', {}",
            params.dimension, params.value, params.year
        ),
    })
}

/// Totals the monthly rows and shapes them for output.
pub(crate) fn build_monthly_breakdown(rows: Vec<DeathSumRow>) -> (i64, Vec<MonthlyDeathPoint>) {
    let mut total: i64 = 0;
    let monthly = rows
        .into_iter()
        .map(|row| {
            let deaths = row.deaths.max(0);
            total += deaths;
            #[allow(clippy::cast_sign_loss)]
            MonthlyDeathPoint {
                month: row.month,
                deaths: deaths as u64,
            }
        })
        .collect();

    (total, monthly)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: i32, deaths: i64) -> DeathSumRow {
        DeathSumRow {
            demographic_value: "Female".to_string(),
            month,
            deaths,
        }
    }

    #[test]
    fn monthly_rows_total_correctly() {
        let (total, monthly) = build_monthly_breakdown(vec![row(1, 10), row(2, 0), row(6, 25)]);

        assert_eq!(total, 35);
        assert_eq!(monthly.len(), 3);
        assert_eq!(monthly[1].deaths, 0);
    }

    #[test]
    fn zero_group_population_yields_undefined_rate_not_an_error() {
        let (total, _) = build_monthly_breakdown(vec![row(1, 10)]);
        assert_eq!(crate::per_capita_rate(total, 0), None);
    }

    #[test]
    fn no_observations_total_zero() {
        let (total, monthly) = build_monthly_breakdown(Vec::new());
        assert_eq!(total, 0);
        assert!(monthly.is_empty());
    }
}
