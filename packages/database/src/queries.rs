//! Reference-data query functions for the star schema dimensions.
//!
//! The analytical fact-table queries live in `epi_map_analytics` next to
//! the computations they feed; this module covers the dimension lookups
//! shared by the server (region/disease listings, the population edge
//! year resolved at startup).

use epi_map_database_models::{DiseaseRow, RegionRow};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Lists all regions, ordered by canonical name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_regions(db: &dyn Database) -> Result<Vec<RegionRow>, DbError> {
    let rows = db
        .query_raw_params("SELECT id, name, code FROM regions ORDER BY name", &[])
        .await?;

    let regions = rows
        .iter()
        .map(|row| RegionRow {
            id: row.to_value("id").unwrap_or(0),
            name: row.to_value("name").unwrap_or_default(),
            code: row.to_value("code").unwrap_or(None),
        })
        .collect();

    Ok(regions)
}

/// Lists all tracked diseases, ordered by canonical name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_diseases(db: &dyn Database) -> Result<Vec<DiseaseRow>, DbError> {
    let rows = db
        .query_raw_params("SELECT id, name FROM diseases ORDER BY name", &[])
        .await?;

    let diseases = rows
        .iter()
        .map(|row| DiseaseRow {
            id: row.to_value("id").unwrap_or(0),
            name: row.to_value("name").unwrap_or_default(),
        })
        .collect();

    Ok(diseases)
}

/// Looks up a region by its canonical name (exact match).
///
/// Returns `None` when no region with that name exists, so callers can
/// distinguish this from a region that exists but has no data.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_region_by_name(
    db: &dyn Database,
    name: &str,
) -> Result<Option<RegionRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, code FROM regions WHERE name = $1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse region id: {e}"),
    })?;

    Ok(Some(RegionRow {
        id,
        name: row.to_value("name").unwrap_or_default(),
        code: row.to_value("code").unwrap_or(None),
    }))
}

/// Looks up a disease by its primary key.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_disease(db: &dyn Database, disease_id: i32) -> Result<Option<DiseaseRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name FROM diseases WHERE id = $1",
            &[DatabaseValue::Int32(disease_id)],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    Ok(Some(DiseaseRow {
        id: disease_id,
        name: row.to_value("name").unwrap_or_default(),
    }))
}

/// Returns the latest year for which `population_by_year` has data, or
/// `None` when the table is empty.
///
/// Resolved once at server startup (unless overridden by configuration)
/// and threaded through every analytical operation as the year-fallback
/// edge.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn latest_population_year(db: &dyn Database) -> Result<Option<i32>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT MAX(year) as max_year FROM population_by_year",
            &[],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let max_year: Option<i32> = row.to_value("max_year").unwrap_or(None);
    Ok(max_year)
}
