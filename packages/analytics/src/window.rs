//! Trailing-window maximum weekly rate.
//!
//! For one region-disease pair and a target (year, week), finds the
//! highest weekly per-capita rate across the trailing 52-week window
//! ending at the target week. The window never reaches into the prior
//! year: near week 1 it is simply shorter.

use epi_map_analytics_models::{WindowMaxParams, WindowMaxResult};
use epi_map_database_models::WeekCaseSum;
use epi_map_epi_models::WeeklyRatePoint;
use switchy_database::Database;

use crate::{
    AnalyticsError, WINDOW_WEEKS, effective_population_year, fetch, per_capita_rate,
};

/// Computes the maximum weekly rate over the trailing window ending at
/// the target week.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the week is out of range, the region
/// does not exist, or a query fails.
pub async fn window_max(
    db: &dyn Database,
    edge_year: i32,
    params: &WindowMaxParams,
) -> Result<WindowMaxResult, AnalyticsError> {
    if !(1..=52).contains(&params.week) {
        return Err(AnalyticsError::Validation {
            message: format!("week must be within [1, 52], got {}", params.week),
        });
    }

    let region = fetch::resolve_region(db, &params.region_name).await?;

    let effective_year = effective_population_year(params.year, edge_year);
    let window_start = window_start(params.week);

    let (week_sums, population) = futures::try_join!(
        fetch::week_case_sums(
            db,
            region.id,
            params.disease_id,
            params.year,
            window_start,
            params.week,
        ),
        fetch::region_population(db, region.id, effective_year),
    )?;

    let weeks = build_weekly_points(week_sums, population);
    let max = window_peak(&weeks);

    Ok(WindowMaxResult {
        region_name: region.name,
        window_start,
        window_end: params.week,
        max,
        weeks,
        description: format!(
            "Max weekly rate over weeks {window_start}-{} of {}",
            params.week, params.year
        ),
    })
}

/// First week of the trailing window, clamped at week 1.
pub(crate) const fn window_start(target_week: i32) -> i32 {
    let start = target_week - WINDOW_WEEKS + 1;
    if start < 1 { 1 } else { start }
}

/// Computes each observed week's per-capita rate against the shared
/// population denominator.
pub(crate) fn build_weekly_points(
    week_sums: Vec<WeekCaseSum>,
    population: Option<i64>,
) -> Vec<WeeklyRatePoint> {
    week_sums
        .into_iter()
        .map(|sum| {
            let cases_per_100k = population.and_then(|p| per_capita_rate(sum.cases, p));

            #[allow(clippy::cast_sign_loss)]
            WeeklyRatePoint {
                week: sum.week,
                cases: sum.cases.max(0) as u64,
                cases_per_100k,
            }
        })
        .collect()
}

/// The week holding the highest defined rate, if any. Ties keep the
/// earliest week.
pub(crate) fn window_peak(weeks: &[WeeklyRatePoint]) -> Option<WeeklyRatePoint> {
    weeks
        .iter()
        .filter(|point| point.cases_per_100k.is_some())
        .max_by(|a, b| {
            a.cases_per_100k
                .partial_cmp(&b.cases_per_100k)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums(entries: &[(i32, i64)]) -> Vec<WeekCaseSum> {
        entries
            .iter()
            .map(|(week, cases)| WeekCaseSum {
                week: *week,
                cases: *cases,
            })
            .collect()
    }

    #[test]
    fn window_start_clamps_at_week_one() {
        assert_eq!(window_start(1), 1);
        assert_eq!(window_start(10), 1);
        assert_eq!(window_start(52), 1);
    }

    #[test]
    fn window_size_never_exceeds_available_history() {
        // With a 52-week window every in-year target keeps the window
        // inside [1, target]: size == min(target, 52).
        for target in 1..=52 {
            let start = window_start(target);
            assert_eq!(target - start + 1, target.min(52));
        }
    }

    #[test]
    fn peak_is_at_least_the_target_week_rate() {
        let weeks = build_weekly_points(
            sums(&[(10, 40), (11, 90), (12, 70)]),
            Some(100_000),
        );
        let peak = window_peak(&weeks).unwrap();
        let target = weeks.iter().find(|w| w.week == 12).unwrap();

        assert!(peak.cases_per_100k.unwrap() >= target.cases_per_100k.unwrap());
        assert_eq!(peak.week, 11);
        assert!((peak.cases_per_100k.unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn partial_window_is_computed_as_is() {
        // Target week 3: only weeks 1-3 can exist; no padding, no error.
        let weeks = build_weekly_points(sums(&[(1, 5), (2, 8), (3, 2)]), Some(10_000));
        let peak = window_peak(&weeks).unwrap();

        assert_eq!(peak.week, 2);
        assert!((peak.cases_per_100k.unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn undefined_population_yields_no_peak() {
        let weeks = build_weekly_points(sums(&[(1, 5), (2, 8)]), Some(0));
        assert!(window_peak(&weeks).is_none());

        let weeks = build_weekly_points(sums(&[(1, 5)]), None);
        assert!(window_peak(&weeks).is_none());
    }

    #[test]
    fn empty_window_yields_no_peak() {
        let weeks = build_weekly_points(Vec::new(), Some(10_000));
        assert!(window_peak(&weeks).is_none());
    }
}
