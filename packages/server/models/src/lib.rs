#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the epi-map server.
//!
//! Query parameter structs keep every field optional so the handler can
//! reject missing or malformed parameters with a descriptive 400
//! instead of a framework-level deserialization error. They are
//! separate from the database row types to allow independent evolution
//! of the API contract.

use epi_map_database_models::{DiseaseRow, RegionRow};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server considers itself healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// A region as returned by the reference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRegion {
    /// Primary key.
    pub id: i32,
    /// Canonical region name.
    pub name: String,
    /// Optional short code.
    pub code: Option<String>,
}

impl From<RegionRow> for ApiRegion {
    fn from(row: RegionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            code: row.code,
        }
    }
}

/// A disease as returned by the reference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDisease {
    /// Primary key.
    pub id: i32,
    /// Canonical disease name.
    pub name: String,
}

impl From<DiseaseRow> for ApiDisease {
    fn from(row: DiseaseRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

/// Query parameters for `GET /api/rates`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesQueryParams {
    /// Comma-separated disease IDs (e.g. `"3"` or `"3,7"`).
    pub disease_ids: Option<String>,
    /// Calendar year.
    pub year: Option<i32>,
    /// Optional week (1-52).
    pub week: Option<i32>,
}

/// Query parameters for `GET /api/rates/windowMax`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMaxQueryParams {
    /// Canonical region name.
    pub region_name: Option<String>,
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// Calendar year.
    pub year: Option<i32>,
    /// Target week (1-52).
    pub week: Option<i32>,
}

/// Query parameters for `GET /api/demographics/estimate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateQueryParams {
    /// Canonical region name.
    pub region_name: Option<String>,
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// Calendar year.
    pub year: Option<i32>,
    /// Race value; given together with `sex` and `ageGroup` to target
    /// one cell.
    pub race: Option<String>,
    /// Sex value.
    pub sex: Option<String>,
    /// Age group value.
    pub age_group: Option<String>,
}

/// Query parameters for `GET /api/outliers`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutliersQueryParams {
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// Calendar year.
    pub year: Option<i32>,
}

/// Query parameters for `GET /api/trends/rising`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsQueryParams {
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// First year of the window (inclusive).
    pub start_year: Option<i32>,
    /// Last year of the window (inclusive).
    pub end_year: Option<i32>,
}

/// Query parameters for `GET /api/demographics/exposure`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureQueryParams {
    /// Canonical region name.
    pub region_name: Option<String>,
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// Calendar year.
    pub year: Option<i32>,
    /// Demographic dimension tag (`RACE`, `SEX`, or `AGE_GROUP`).
    pub dimension: Option<String>,
}

/// Query parameters for `GET /api/compare`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQueryParams {
    /// Canonical region name.
    pub region_name: Option<String>,
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// First year of the series (inclusive).
    pub start_year: Option<i32>,
    /// Last year of the series (inclusive).
    pub end_year: Option<i32>,
}

/// Query parameters for `GET /api/deaths/rate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathRateQueryParams {
    /// Disease ID.
    pub disease_id: Option<i32>,
    /// Calendar year.
    pub year: Option<i32>,
    /// Demographic dimension tag (`RACE`, `SEX`, or `AGE_GROUP`).
    pub dimension: Option<String>,
    /// The demographic value to filter to (exact match).
    pub value: Option<String>,
}
