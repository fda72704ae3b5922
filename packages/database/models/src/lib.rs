#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types for the epi-map star schema.
//!
//! These types represent the shapes of data as retrieved from the
//! Postgres star schema. They are distinct from the API response types in
//! `epi_map_server_models` to allow independent evolution of the two.

use epi_map_epi_models::DemographicCell;
use serde::{Deserialize, Serialize};

/// A region (state) row from the `regions` dimension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRow {
    /// Primary key.
    pub id: i32,
    /// Canonical region name (e.g. "California").
    pub name: String,
    /// Optional short code (e.g. "CA").
    pub code: Option<String>,
}

/// A disease row from the `diseases` dimension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRow {
    /// Primary key.
    pub id: i32,
    /// Canonical disease name.
    pub name: String,
}

/// A summed case count for one region over some scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCaseSum {
    /// Region primary key.
    pub region_id: i32,
    /// Canonical region name.
    pub region_name: String,
    /// Total cases (NULL observations counted as zero).
    pub cases: i64,
}

/// A summed case count for one week of one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCaseSum {
    /// Week number (1-52).
    pub week: i32,
    /// Total cases for that week.
    pub cases: i64,
}

/// A summed case count for one region-year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionYearCaseSum {
    /// Region primary key.
    pub region_id: i32,
    /// Canonical region name.
    pub region_name: String,
    /// Calendar year.
    pub year: i32,
    /// Total cases for that region-year.
    pub cases: i64,
}

/// A demographic population row from `population_demographics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicPopulationRow {
    /// The demographic cell this population belongs to.
    pub cell: DemographicCell,
    /// Resident population of the cell.
    pub population: i64,
}

/// A summed death count for one demographic value in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSumRow {
    /// The demographic value (e.g. "Female", "65+").
    pub demographic_value: String,
    /// Calendar month (1-12).
    pub month: i32,
    /// Total deaths.
    pub deaths: i64,
}
