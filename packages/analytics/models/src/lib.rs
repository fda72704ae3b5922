#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parameter and result types for the epi-map analytical operations.
//!
//! Each analytical operation in `epi_map_analytics` takes one of these
//! fully-validated parameter structs and returns the matching result
//! type. The HTTP layer deserializes query strings into the parameter
//! structs and serializes results straight to JSON.

use epi_map_epi_models::{
    CellEstimate, DemographicCell, DemographicDimension, GroupExposure, MonthlyDeathPoint,
    RateComparisonPoint, RegionRate, WeeklyRatePoint,
};
use serde::{Deserialize, Serialize};

/// Parameters for the per-region rate ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRankingParams {
    /// Disease(s) to aggregate over. Must be non-empty.
    pub disease_ids: Vec<i32>,
    /// Calendar year of the case scope.
    pub year: i32,
    /// Optional week (1-52) to narrow the scope to a single week.
    pub week: Option<i32>,
}

/// Result of the per-region rate ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRankingResult {
    /// Per-region rates, descending by rate with undefined rates last.
    pub rates: Vec<RegionRate>,
    /// The population year actually used after year-fallback.
    pub effective_population_year: i32,
    /// Human-readable description of the scope.
    pub description: String,
}

/// Parameters for the trailing-window maximum weekly rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMaxParams {
    /// Canonical region name.
    pub region_name: String,
    /// Disease to aggregate.
    pub disease_id: i32,
    /// Calendar year.
    pub year: i32,
    /// Target week (1-52); the window trails back from here.
    pub week: i32,
}

/// Result of the trailing-window maximum weekly rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMaxResult {
    /// Canonical region name.
    pub region_name: String,
    /// First week of the window (clamped at 1).
    pub window_start: i32,
    /// Target week the window ends at.
    pub window_end: i32,
    /// The week holding the maximum rate, if any rate was defined.
    pub max: Option<WeeklyRatePoint>,
    /// Every week of the window that had observations.
    pub weeks: Vec<WeeklyRatePoint>,
    /// Human-readable description of the window.
    pub description: String,
}

/// Parameters for the proportional demographic case estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateParams {
    /// Canonical region name.
    pub region_name: String,
    /// Disease whose cases are distributed.
    pub disease_id: i32,
    /// Calendar year of the case scope.
    pub year: i32,
    /// When present, restrict the output to this single cell.
    pub cell: Option<DemographicCell>,
}

/// Result of the proportional demographic case estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    /// Total cases distributed across the cells.
    pub total_cases: u64,
    /// Total demographic population the shares were computed against.
    pub total_population: u64,
    /// Per-cell allocations, descending by estimated cases.
    pub estimates: Vec<CellEstimate>,
    /// Human-readable description of the scope.
    pub description: String,
}

/// Parameters for the rate outlier detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierParams {
    /// Disease defining the peer group.
    pub disease_id: i32,
    /// Calendar year of the case scope.
    pub year: i32,
}

/// Result of the rate outlier detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierResult {
    /// Regions whose rate exceeds `mean + stdDev`, descending by rate.
    pub outliers: Vec<RegionRate>,
    /// Mean rate over the peer group, if the group was non-empty.
    pub mean: Option<f64>,
    /// Population standard deviation over the peer group.
    pub std_dev: Option<f64>,
    /// Number of regions with a defined rate in the peer group.
    pub peer_group_size: usize,
    /// Human-readable description of the peer group.
    pub description: String,
}

/// Parameters for the rising-trend detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RisingTrendParams {
    /// Disease to analyze.
    pub disease_id: i32,
    /// First year of the window (inclusive).
    pub start_year: i32,
    /// Last year of the window (inclusive); must equal `start_year + 3`.
    pub end_year: i32,
}

/// One year of a region's rate series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRate {
    /// Calendar year.
    pub year: i32,
    /// Cases per 100,000 for that year.
    pub cases_per_100k: f64,
}

/// A region whose rate rose strictly across the whole window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTrend {
    /// Region primary key.
    pub region_id: i32,
    /// Canonical region name.
    pub region_name: String,
    /// The full rate series across the window, ordered by year.
    pub rates: Vec<YearRate>,
}

/// Result of the rising-trend detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RisingTrendResult {
    /// Regions with a complete, strictly increasing series.
    pub regions: Vec<RegionTrend>,
    /// Human-readable description of the window.
    pub description: String,
}

/// Parameters for the demographic exposure analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureParams {
    /// Canonical region name.
    pub region_name: String,
    /// Disease to analyze.
    pub disease_id: i32,
    /// Calendar year of the case scope.
    pub year: i32,
    /// Which demographic dimension to break the exposure down by.
    pub dimension: DemographicDimension,
}

/// Result of the demographic exposure analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureResult {
    /// Per-group exposures, descending by over/under-exposure.
    pub groups: Vec<GroupExposure>,
    /// Total cases attributed across the groups.
    pub total_cases: u64,
    /// Total population the shares were computed against.
    pub total_population: u64,
    /// Human-readable description of the breakdown.
    pub description: String,
}

/// Parameters for the region-vs-national rate comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareParams {
    /// Canonical region name.
    pub region_name: String,
    /// Disease to compare.
    pub disease_id: i32,
    /// First year of the series (inclusive).
    pub start_year: i32,
    /// Last year of the series (inclusive); must be >= `start_year`.
    pub end_year: i32,
}

/// Result of the region-vs-national rate comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    /// One point per year in `[startYear, endYear]`, no gaps.
    pub series: Vec<RateComparisonPoint>,
    /// Human-readable description of the comparison.
    pub description: String,
}

/// Parameters for the demographic death-rate analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathRateParams {
    /// Disease to analyze.
    pub disease_id: i32,
    /// Calendar year of the death scope.
    pub year: i32,
    /// Which demographic dimension the value belongs to.
    pub dimension: DemographicDimension,
    /// The demographic value to filter to (exact match).
    pub value: String,
}

/// Result of the demographic death-rate analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathRateResult {
    /// Total deaths in scope.
    pub deaths: u64,
    /// Population of the demographic group after year-fallback.
    pub population: u64,
    /// Deaths per 100,000 group residents, if the denominator is defined.
    pub deaths_per_100k: Option<f64>,
    /// Monthly breakdown, ordered by month.
    pub monthly: Vec<MonthlyDeathPoint>,
    /// Human-readable description of the scope.
    pub description: String,
}
