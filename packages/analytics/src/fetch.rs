//! Fact-table fetch functions shared by the analytical operations.
//!
//! Every function returns rows already coerced to native numeric types.
//! Aggregate sums are cast to `BIGINT` in SQL so the coercion is fixed
//! at the query, not left to driver configuration. NULL case counts are
//! `COALESCE`d to zero inside the `SUM`, matching the rule that a null
//! observation counts as zero.

use std::collections::HashMap;
use std::fmt::Write as _;

use epi_map_database_models::{
    DeathSumRow, DemographicPopulationRow, RegionCaseSum, RegionRow, RegionYearCaseSum, WeekCaseSum,
};
use epi_map_epi_models::{DemographicCell, DemographicDimension};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::AnalyticsError;

/// Builds a `$n, $n+1, ...` placeholder list for an `IN` clause.
fn placeholders(start: u32, count: usize) -> String {
    let mut out = String::new();
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        #[allow(clippy::cast_possible_truncation)]
        let idx = start + i as u32;
        write!(out, "${idx}").unwrap();
    }
    out
}

/// Resolves a region by canonical name, failing with `NotFound` when no
/// such region exists.
pub async fn resolve_region(db: &dyn Database, name: &str) -> Result<RegionRow, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, code FROM regions WHERE name = $1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Err(AnalyticsError::NotFound {
            message: format!("No region named '{name}'"),
        });
    };

    let id: i32 = row.to_value("id").map_err(|e| AnalyticsError::Conversion {
        message: format!("Failed to parse region id: {e}"),
    })?;

    Ok(RegionRow {
        id,
        name: row.to_value("name").unwrap_or_default(),
        code: row.to_value("code").unwrap_or(None),
    })
}

/// Sums cases per region for a disease set and year, optionally narrowed
/// to a single week. Every region appears, including regions with no
/// observations: an empty scope sums to zero, not null.
pub async fn case_sums_by_region(
    db: &dyn Database,
    disease_ids: &[i32],
    year: i32,
    week: Option<i32>,
) -> Result<Vec<RegionCaseSum>, AnalyticsError> {
    let disease_list = placeholders(1, disease_ids.len());
    #[allow(clippy::cast_possible_truncation)]
    let year_idx = disease_ids.len() as u32 + 1;

    let mut join = format!(
        "LEFT JOIN weekly_cases w
            ON w.region_id = r.id
           AND w.disease_id IN ({disease_list})
           AND w.year = ${year_idx}"
    );

    let mut params: Vec<DatabaseValue> = disease_ids
        .iter()
        .map(|id| DatabaseValue::Int32(*id))
        .collect();
    params.push(DatabaseValue::Int32(year));

    if let Some(week) = week {
        write!(join, " AND w.week = ${}", year_idx + 1).unwrap();
        params.push(DatabaseValue::Int32(week));
    }

    let sql = format!(
        "SELECT r.id as region_id, r.name as region_name,
                COALESCE(SUM(COALESCE(w.case_count, 0)), 0)::BIGINT as cases
         FROM regions r
         {join}
         GROUP BY r.id, r.name
         ORDER BY r.name"
    );

    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows
        .iter()
        .map(|row| RegionCaseSum {
            region_id: row.to_value("region_id").unwrap_or(0),
            region_name: row.to_value("region_name").unwrap_or_default(),
            cases: row.to_value("cases").unwrap_or(0),
        })
        .collect())
}

/// Fetches the population of every region for one (already effective)
/// year, keyed by region id.
pub async fn population_by_region(
    db: &dyn Database,
    year: i32,
) -> Result<HashMap<i32, i64>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT region_id, population FROM population_by_year WHERE year = $1",
            &[DatabaseValue::Int32(year)],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("region_id").unwrap_or(0),
                row.to_value("population").unwrap_or(0),
            )
        })
        .collect())
}

/// Fetches one region's population for one (already effective) year.
/// `None` means no population row exists for that region-year.
pub async fn region_population(
    db: &dyn Database,
    region_id: i32,
    year: i32,
) -> Result<Option<i64>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT population FROM population_by_year WHERE region_id = $1 AND year = $2",
            &[DatabaseValue::Int32(region_id), DatabaseValue::Int32(year)],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    Ok(Some(row.to_value("population").unwrap_or(0)))
}

/// Fetches populations for a set of (already effective) years, keyed by
/// `(region_id, year)`.
pub async fn populations_for_years(
    db: &dyn Database,
    years: &[i32],
) -> Result<HashMap<(i32, i32), i64>, AnalyticsError> {
    if years.is_empty() {
        return Ok(HashMap::new());
    }

    let year_list = placeholders(1, years.len());
    let sql = format!(
        "SELECT region_id, year, population
         FROM population_by_year
         WHERE year IN ({year_list})"
    );

    let params: Vec<DatabaseValue> = years.iter().map(|y| DatabaseValue::Int32(*y)).collect();
    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows
        .iter()
        .map(|row| {
            let region_id: i32 = row.to_value("region_id").unwrap_or(0);
            let year: i32 = row.to_value("year").unwrap_or(0);
            let population: i64 = row.to_value("population").unwrap_or(0);
            ((region_id, year), population)
        })
        .collect())
}

/// Fetches one region's populations for a set of (already effective)
/// years, keyed by year.
pub async fn region_populations_for_years(
    db: &dyn Database,
    region_id: i32,
    years: &[i32],
) -> Result<HashMap<i32, i64>, AnalyticsError> {
    if years.is_empty() {
        return Ok(HashMap::new());
    }

    let year_list = placeholders(2, years.len());
    let sql = format!(
        "SELECT year, population
         FROM population_by_year
         WHERE region_id = $1 AND year IN ({year_list})"
    );

    let mut params: Vec<DatabaseValue> = vec![DatabaseValue::Int32(region_id)];
    params.extend(years.iter().map(|y| DatabaseValue::Int32(*y)));

    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("year").unwrap_or(0),
                row.to_value("population").unwrap_or(0),
            )
        })
        .collect())
}

/// Sums the population over all regions for each (already effective)
/// year, keyed by year. Sum-then-divide semantics for national rates
/// start here: the national denominator is a single summed population.
pub async fn national_populations_for_years(
    db: &dyn Database,
    years: &[i32],
) -> Result<HashMap<i32, i64>, AnalyticsError> {
    if years.is_empty() {
        return Ok(HashMap::new());
    }

    let year_list = placeholders(1, years.len());
    let sql = format!(
        "SELECT year, SUM(population)::BIGINT as population
         FROM population_by_year
         WHERE year IN ({year_list})
         GROUP BY year"
    );

    let params: Vec<DatabaseValue> = years.iter().map(|y| DatabaseValue::Int32(*y)).collect();
    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("year").unwrap_or(0),
                row.to_value("population").unwrap_or(0),
            )
        })
        .collect())
}

/// Sums cases over a whole scope: one region (or all regions) for a
/// disease-year. An empty scope sums to zero.
pub async fn total_cases(
    db: &dyn Database,
    region_id: Option<i32>,
    disease_id: i32,
    year: i32,
) -> Result<i64, AnalyticsError> {
    let mut sql = String::from(
        "SELECT COALESCE(SUM(COALESCE(case_count, 0)), 0)::BIGINT as total
         FROM weekly_cases
         WHERE disease_id = $1 AND year = $2",
    );

    let mut params = vec![
        DatabaseValue::Int32(disease_id),
        DatabaseValue::Int32(year),
    ];

    if let Some(region_id) = region_id {
        sql.push_str(" AND region_id = $3");
        params.push(DatabaseValue::Int32(region_id));
    }

    let rows = db.query_raw_params(&sql, &params).await?;
    Ok(rows.first().map_or(0, |r| r.to_value("total").unwrap_or(0)))
}

/// Sums cases per week for one region-disease-year over a week range.
/// Only weeks with observations appear; absent weeks are zero.
pub async fn week_case_sums(
    db: &dyn Database,
    region_id: i32,
    disease_id: i32,
    year: i32,
    start_week: i32,
    end_week: i32,
) -> Result<Vec<WeekCaseSum>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT week, COALESCE(SUM(COALESCE(case_count, 0)), 0)::BIGINT as cases
             FROM weekly_cases
             WHERE region_id = $1 AND disease_id = $2 AND year = $3
               AND week BETWEEN $4 AND $5
             GROUP BY week
             ORDER BY week",
            &[
                DatabaseValue::Int32(region_id),
                DatabaseValue::Int32(disease_id),
                DatabaseValue::Int32(year),
                DatabaseValue::Int32(start_week),
                DatabaseValue::Int32(end_week),
            ],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| WeekCaseSum {
            week: row.to_value("week").unwrap_or(0),
            cases: row.to_value("cases").unwrap_or(0),
        })
        .collect())
}

/// Sums cases per region-year for one disease over an inclusive year
/// range. Region-years with no observations are absent; completeness
/// filtering happens in the caller.
pub async fn region_year_case_sums(
    db: &dyn Database,
    disease_id: i32,
    start_year: i32,
    end_year: i32,
) -> Result<Vec<RegionYearCaseSum>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT w.region_id, r.name as region_name, w.year,
                    COALESCE(SUM(COALESCE(w.case_count, 0)), 0)::BIGINT as cases
             FROM weekly_cases w
             JOIN regions r ON r.id = w.region_id
             WHERE w.disease_id = $1 AND w.year BETWEEN $2 AND $3
             GROUP BY w.region_id, r.name, w.year
             ORDER BY r.name, w.year",
            &[
                DatabaseValue::Int32(disease_id),
                DatabaseValue::Int32(start_year),
                DatabaseValue::Int32(end_year),
            ],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| RegionYearCaseSum {
            region_id: row.to_value("region_id").unwrap_or(0),
            region_name: row.to_value("region_name").unwrap_or_default(),
            year: row.to_value("year").unwrap_or(0),
            cases: row.to_value("cases").unwrap_or(0),
        })
        .collect())
}

/// Sums cases per year for one region (or all regions) for a disease
/// over an inclusive year range, keyed by year. Years with no
/// observations are absent; the caller gap-fills.
pub async fn year_case_sums(
    db: &dyn Database,
    region_id: Option<i32>,
    disease_id: i32,
    start_year: i32,
    end_year: i32,
) -> Result<HashMap<i32, i64>, AnalyticsError> {
    let mut sql = String::from(
        "SELECT year, COALESCE(SUM(COALESCE(case_count, 0)), 0)::BIGINT as cases
         FROM weekly_cases
         WHERE disease_id = $1 AND year BETWEEN $2 AND $3",
    );

    let mut params = vec![
        DatabaseValue::Int32(disease_id),
        DatabaseValue::Int32(start_year),
        DatabaseValue::Int32(end_year),
    ];

    if let Some(region_id) = region_id {
        sql.push_str(" AND region_id = $4");
        params.push(DatabaseValue::Int32(region_id));
    }

    sql.push_str(" GROUP BY year");

    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("year").unwrap_or(0),
                row.to_value("cases").unwrap_or(0),
            )
        })
        .collect())
}

/// Fetches the full demographic cell breakdown for one region and one
/// (already effective) year.
pub async fn demographic_populations(
    db: &dyn Database,
    region_id: i32,
    year: i32,
) -> Result<Vec<DemographicPopulationRow>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT race, sex, age_group, population
             FROM population_demographics
             WHERE region_id = $1 AND year = $2
             ORDER BY race, sex, age_group",
            &[DatabaseValue::Int32(region_id), DatabaseValue::Int32(year)],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| DemographicPopulationRow {
            cell: DemographicCell {
                race: row.to_value("race").unwrap_or_default(),
                sex: row.to_value("sex").unwrap_or_default(),
                age_group: row.to_value("age_group").unwrap_or_default(),
            },
            population: row.to_value("population").unwrap_or(0),
        })
        .collect())
}

/// Sums demographic populations for one region and one (already
/// effective) year, grouped by the values of a single dimension.
///
/// The dimension maps to its column through the closed
/// [`DemographicDimension`] enum; there is no string-driven column
/// selection.
pub async fn group_populations(
    db: &dyn Database,
    region_id: i32,
    year: i32,
    dimension: DemographicDimension,
) -> Result<Vec<(String, i64)>, AnalyticsError> {
    let column = dimension.column();
    let sql = format!(
        "SELECT {column} as value, SUM(population)::BIGINT as population
         FROM population_demographics
         WHERE region_id = $1 AND year = $2
         GROUP BY {column}
         ORDER BY {column}"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[DatabaseValue::Int32(region_id), DatabaseValue::Int32(year)],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("value").unwrap_or_default(),
                row.to_value("population").unwrap_or(0),
            )
        })
        .collect())
}

/// Sums the population of one demographic group across all regions for
/// one (already effective) year.
///
/// Returns `None` when no cell matches the value at all, so callers can
/// distinguish "no matching population cell" from "population is 0".
pub async fn group_population(
    db: &dyn Database,
    year: i32,
    dimension: DemographicDimension,
    value: &str,
) -> Result<Option<i64>, AnalyticsError> {
    let column = dimension.column();
    let sql = format!(
        "SELECT SUM(population)::BIGINT as population, COUNT(*) as cells
         FROM population_demographics
         WHERE year = $1 AND {column} = $2"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::Int32(year),
                DatabaseValue::String(value.to_string()),
            ],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let cells: i64 = row.to_value("cells").unwrap_or(0);
    if cells == 0 {
        return Ok(None);
    }

    Ok(Some(row.to_value("population").unwrap_or(0)))
}

/// Sums death counts per demographic value for one disease-year within
/// one dimension. Used as the observed case-attribution weighting for
/// the exposure analysis.
pub async fn death_weights(
    db: &dyn Database,
    disease_id: i32,
    year: i32,
    dimension: DemographicDimension,
) -> Result<Vec<(String, i64)>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT demographic_value, SUM(death_count)::BIGINT as deaths
             FROM deaths
             WHERE disease_id = $1 AND year = $2 AND demographic_type = $3
             GROUP BY demographic_value
             ORDER BY demographic_value",
            &[
                DatabaseValue::Int32(disease_id),
                DatabaseValue::Int32(year),
                DatabaseValue::String(dimension.as_ref().to_string()),
            ],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("demographic_value").unwrap_or_default(),
                row.to_value("deaths").unwrap_or(0),
            )
        })
        .collect())
}

/// Sums death counts per month for one disease-year and one demographic
/// value. Only months with observations appear.
pub async fn monthly_death_sums(
    db: &dyn Database,
    disease_id: i32,
    year: i32,
    dimension: DemographicDimension,
    value: &str,
) -> Result<Vec<DeathSumRow>, AnalyticsError> {
    let rows = db
        .query_raw_params(
            "SELECT demographic_value, month, SUM(death_count)::BIGINT as deaths
             FROM deaths
             WHERE disease_id = $1 AND year = $2
               AND demographic_type = $3 AND demographic_value = $4
             GROUP BY demographic_value, month
             ORDER BY month",
            &[
                DatabaseValue::Int32(disease_id),
                DatabaseValue::Int32(year),
                DatabaseValue::String(dimension.as_ref().to_string()),
                DatabaseValue::String(value.to_string()),
            ],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| DeathSumRow {
            demographic_value: row.to_value("demographic_value").unwrap_or_default(),
            month: row.to_value("month").unwrap_or(0),
            deaths: row.to_value("deaths").unwrap_or(0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_sequential_from_start() {
        assert_eq!(placeholders(1, 3), "$1, $2, $3");
        assert_eq!(placeholders(4, 2), "$4, $5");
        assert_eq!(placeholders(1, 0), "");
    }
}
