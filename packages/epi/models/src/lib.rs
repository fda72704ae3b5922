#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Epidemiological domain types shared across the epi-map system.
//!
//! This crate defines the closed demographic dimension taxonomy and the
//! statistical result primitives (per-capita rates, shares, exposures)
//! produced by the analytics layer.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The three demographic dimensions a breakdown can be keyed by.
///
/// Exactly one dimension must be specified wherever a demographic filter
/// is accepted; any other tag is rejected as a validation error rather
/// than falling through to an unfiltered query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DemographicDimension {
    /// Race breakdown.
    Race,
    /// Sex breakdown.
    Sex,
    /// Age group breakdown.
    AgeGroup,
}

impl DemographicDimension {
    /// Returns the `population_demographics` column this dimension maps to.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Sex => "sex",
            Self::AgeGroup => "age_group",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Race, Self::Sex, Self::AgeGroup]
    }
}

/// A unique (race, sex, age group) demographic combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicCell {
    /// Race value (e.g. "White", "Black or African American").
    pub race: String,
    /// Sex value (e.g. "Male", "Female").
    pub sex: String,
    /// Age group value (e.g. "0-4", "65+").
    pub age_group: String,
}

/// Per-capita rate statistics for one region.
///
/// `cases_per_100k` is `None` when the region has no usable population
/// for the effective year (zero or missing denominator). Such regions
/// sort after every region with a defined rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRate {
    /// Region primary key.
    pub region_id: i32,
    /// Canonical region name.
    pub region_name: String,
    /// Summed case count over the requested scope.
    pub total_cases: u64,
    /// Population denominator after year-fallback, if available.
    pub population: Option<u64>,
    /// Cases per 100,000 residents, if the denominator is defined.
    pub cases_per_100k: Option<f64>,
}

/// A single week's per-capita rate within a sliding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRatePoint {
    /// Week number (1-52).
    pub week: i32,
    /// Summed case count for that week.
    pub cases: u64,
    /// Cases per 100,000 residents, if the denominator is defined.
    pub cases_per_100k: Option<f64>,
}

/// One year of a region-vs-national rate comparison.
///
/// Years with no observations carry a `0.0` rate rather than being
/// omitted, so a series over `[startYear, endYear]` always has exactly
/// one point per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateComparisonPoint {
    /// Calendar year.
    pub year: i32,
    /// The region's cases per 100,000 for this year.
    pub region_rate: f64,
    /// The national (all regions combined) cases per 100,000 for this year.
    pub national_rate: f64,
}

/// Estimated case allocation for one demographic cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEstimate {
    /// The demographic cell.
    pub cell: DemographicCell,
    /// Population of this cell for the effective year.
    pub population: u64,
    /// Cases allocated to this cell in proportion to population share.
    pub estimated_cases: f64,
    /// Estimated cases per 100,000 cell residents, if defined.
    pub cases_per_100k: Option<f64>,
}

/// Over/under-exposure of one demographic group.
///
/// Shares are rounded to four decimal places at the output boundary;
/// the sum invariants (shares to 1, exposures to 0) hold on the
/// unrounded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExposure {
    /// The demographic value (e.g. "Female", "65+").
    pub value: String,
    /// Group population for the effective year.
    pub population: u64,
    /// Group share of the total population, rounded to 4 decimals.
    pub share_of_population: f64,
    /// Cases attributed to this group.
    pub estimated_cases: f64,
    /// Group share of total cases, rounded to 4 decimals.
    pub share_of_cases: f64,
    /// `share_of_cases - share_of_population`, rounded to 4 decimals.
    pub over_under_exposure: f64,
}

/// Death count for a single month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDeathPoint {
    /// Calendar month (1-12).
    pub month: i32,
    /// Summed death count for that month.
    pub deaths: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_parses_canonical_tags() {
        assert_eq!(
            "AGE_GROUP".parse::<DemographicDimension>().unwrap(),
            DemographicDimension::AgeGroup
        );
        assert_eq!(
            "RACE".parse::<DemographicDimension>().unwrap(),
            DemographicDimension::Race
        );
    }

    #[test]
    fn dimension_rejects_unknown_tag() {
        assert!("ETHNICITY".parse::<DemographicDimension>().is_err());
        assert!("Age Group".parse::<DemographicDimension>().is_err());
    }

    #[test]
    fn dimension_maps_to_columns() {
        assert_eq!(DemographicDimension::Race.column(), "race");
        assert_eq!(DemographicDimension::Sex.column(), "sex");
        assert_eq!(DemographicDimension::AgeGroup.column(), "age_group");
    }
}
