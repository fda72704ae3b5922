//! Rate outlier detection across the region peer group.
//!
//! Computes the mean and population standard deviation (divide by N,
//! not N-1) of per-region rates for one disease-year, then flags
//! regions whose rate exceeds one standard deviation above the mean.
//! The threshold is fixed policy, not configurable.

use epi_map_analytics_models::{OutlierParams, OutlierResult};
use switchy_database::Database;

use crate::{
    AnalyticsError, effective_population_year, fetch, rates::build_region_rates,
    sort_rates_descending,
};

/// Flags regions whose rate exceeds `mean + stddev` over the peer group
/// of all regions with a defined rate for the disease-year.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a query fails.
pub async fn detect_outliers(
    db: &dyn Database,
    edge_year: i32,
    params: &OutlierParams,
) -> Result<OutlierResult, AnalyticsError> {
    let effective_year = effective_population_year(params.year, edge_year);

    let disease_ids = [params.disease_id];
    let (case_sums, populations) = futures::try_join!(
        fetch::case_sums_by_region(db, &disease_ids, params.year, None),
        fetch::population_by_region(db, effective_year),
    )?;

    let all_rates = build_region_rates(case_sums, &populations);

    // Peer group: regions with a defined rate. Regions without a usable
    // denominator have no rate to compare and cannot be flagged.
    let peer_values: Vec<f64> = all_rates
        .iter()
        .filter_map(|rate| rate.cases_per_100k)
        .collect();

    let stats = mean_std_dev(&peer_values);

    let mut outliers = match stats {
        Some((mean, std_dev)) => {
            let threshold = mean + std_dev;
            all_rates
                .into_iter()
                .filter(|rate| rate.cases_per_100k.is_some_and(|value| value > threshold))
                .collect()
        }
        None => Vec::new(),
    };

    sort_rates_descending(&mut outliers);

    log::debug!(
        "Found {} outlier regions for disease {} in {} over a peer group of {}",
        outliers.len(),
        params.disease_id,
        params.year,
        peer_values.len()
    );

    Ok(OutlierResult {
        outliers,
        mean: stats.map(|(mean, _)| mean),
        std_dev: stats.map(|(_, std_dev)| std_dev),
        peer_group_size: peer_values.len(),
        description: format!(
            "Regions more than one standard deviation above the mean rate, {}",
            params.year
        ),
    })
}

/// Mean and population standard deviation of a value set.
///
/// Variance divides by N (population form), matching the fixed policy
/// of the outlier threshold. Returns `None` for an empty set, the
/// guard that keeps an empty peer group from faulting.
#[must_use]
pub fn mean_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some((mean, variance.sqrt()))
}

#[cfg(test)]
mod tests {
    use statrs::statistics::Statistics as _;

    use super::*;

    #[test]
    fn empty_peer_group_has_no_stats() {
        assert_eq!(mean_std_dev(&[]), None);
    }

    #[test]
    fn single_member_peer_group_has_zero_std_dev() {
        let (mean, std_dev) = mean_std_dev(&[42.0]).unwrap();
        assert!((mean - 42.0).abs() < f64::EPSILON);
        assert!(std_dev.abs() < f64::EPSILON);
        // rate > mean + 0 is never true for the member itself, so a
        // peer group of one can never produce an outlier.
        assert!(mean + std_dev >= 42.0);
    }

    #[test]
    fn identical_values_produce_no_outliers() {
        let values = [10.0, 10.0, 10.0, 10.0];
        let (mean, std_dev) = mean_std_dev(&values).unwrap();

        assert!(std_dev.abs() < f64::EPSILON);
        assert!(values.iter().all(|v| *v <= mean + std_dev));
    }

    #[test]
    fn divides_by_n_not_n_minus_one() {
        let values = [2.0, 4.0, 6.0, 8.0];
        let (mean, std_dev) = mean_std_dev(&values).unwrap();

        assert!((mean - 5.0).abs() < 1e-12);
        // Population variance of [2,4,6,8] is 5; sample variance would
        // be 20/3.
        assert!((std_dev - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn matches_statrs_population_moments() {
        let values = [3.1, 14.0, 2.7, 81.5, 42.0, 9.9];
        let (mean, std_dev) = mean_std_dev(&values).unwrap();

        assert!((mean - values.iter().mean()).abs() < 1e-9);
        assert!((std_dev - values.iter().population_std_dev()).abs() < 1e-9);
    }

    #[test]
    fn flags_only_values_above_one_std_dev() {
        let values = [10.0, 10.0, 10.0, 50.0];
        let (mean, std_dev) = mean_std_dev(&values).unwrap();
        let threshold = mean + std_dev;

        let flagged: Vec<f64> = values.iter().copied().filter(|v| *v > threshold).collect();
        assert_eq!(flagged, vec![50.0]);
    }
}
