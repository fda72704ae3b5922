//! HTTP handler functions for the epi-map API.
//!
//! Handlers own request-shape validation: missing or malformed
//! parameters are rejected with a descriptive 400 before the analytics
//! layer runs. Analytical not-found conditions map to 404 and
//! infrastructure failures to a generic 500. Undefined arithmetic never
//! surfaces as an error; it arrives as `null`/zero values in the result
//! body.

use actix_web::{HttpResponse, web};
use epi_map_analytics::AnalyticsError;
use epi_map_analytics_models::{
    CompareParams, DeathRateParams, EstimateParams, ExposureParams, OutlierParams,
    RateRankingParams, RisingTrendParams, WindowMaxParams,
};
use epi_map_database::queries;
use epi_map_epi_models::{DemographicCell, DemographicDimension};
use epi_map_server_models::{
    ApiDisease, ApiHealth, ApiRegion, CompareQueryParams, DeathRateQueryParams,
    EstimateQueryParams, ExposureQueryParams, OutliersQueryParams, RatesQueryParams,
    TrendsQueryParams, WindowMaxQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/regions`
///
/// Lists the region reference dimension.
pub async fn regions(state: web::Data<AppState>) -> HttpResponse {
    match queries::list_regions(state.db.as_ref()).await {
        Ok(rows) => {
            let regions: Vec<ApiRegion> = rows.into_iter().map(ApiRegion::from).collect();
            HttpResponse::Ok().json(regions)
        }
        Err(e) => {
            log::error!("Failed to list regions: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to list regions"
            }))
        }
    }
}

/// `GET /api/diseases`
///
/// Lists the disease reference dimension.
pub async fn diseases(state: web::Data<AppState>) -> HttpResponse {
    match queries::list_diseases(state.db.as_ref()).await {
        Ok(rows) => {
            let diseases: Vec<ApiDisease> = rows.into_iter().map(ApiDisease::from).collect();
            HttpResponse::Ok().json(diseases)
        }
        Err(e) => {
            log::error!("Failed to list diseases: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to list diseases"
            }))
        }
    }
}

/// `GET /api/rates`
///
/// Ranks regions by cases per 100k for a disease scope.
pub async fn rates(state: web::Data<AppState>, params: web::Query<RatesQueryParams>) -> HttpResponse {
    let disease_ids = match parse_disease_ids(params.disease_ids.as_deref()) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let Some(year) = params.year else {
        return bad_request("year is required");
    };

    let op_params = RateRankingParams {
        disease_ids,
        year,
        week: params.week,
    };

    match epi_map_analytics::rates::rank_rates(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to rank rates", &e),
    }
}

/// `GET /api/rates/windowMax`
///
/// Maximum weekly rate over the trailing 52-week window.
pub async fn window_max(
    state: web::Data<AppState>,
    params: web::Query<WindowMaxQueryParams>,
) -> HttpResponse {
    let Some(region_name) = non_empty(params.region_name.as_deref()) else {
        return bad_request("regionName is required");
    };
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(year) = params.year else {
        return bad_request("year is required");
    };
    let Some(week) = params.week else {
        return bad_request("week is required");
    };

    let op_params = WindowMaxParams {
        region_name,
        disease_id,
        year,
        week,
    };

    match epi_map_analytics::window::window_max(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to compute window max", &e),
    }
}

/// `GET /api/demographics/estimate`
///
/// Population-proportional demographic case estimate, for all cells or
/// a single (race, sex, ageGroup) cell.
pub async fn demographic_estimate(
    state: web::Data<AppState>,
    params: web::Query<EstimateQueryParams>,
) -> HttpResponse {
    let Some(region_name) = non_empty(params.region_name.as_deref()) else {
        return bad_request("regionName is required");
    };
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(year) = params.year else {
        return bad_request("year is required");
    };

    let cell = match (
        non_empty(params.race.as_deref()),
        non_empty(params.sex.as_deref()),
        non_empty(params.age_group.as_deref()),
    ) {
        (Some(race), Some(sex), Some(age_group)) => Some(DemographicCell {
            race,
            sex,
            age_group,
        }),
        (None, None, None) => None,
        _ => {
            return bad_request("race, sex, and ageGroup must be specified together");
        }
    };

    let op_params = EstimateParams {
        region_name,
        disease_id,
        year,
        cell,
    };

    match epi_map_analytics::estimate::estimate_cases(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to estimate demographic cases", &e),
    }
}

/// `GET /api/outliers`
///
/// Regions more than one standard deviation above the mean rate.
pub async fn outliers(
    state: web::Data<AppState>,
    params: web::Query<OutliersQueryParams>,
) -> HttpResponse {
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(year) = params.year else {
        return bad_request("year is required");
    };

    let op_params = OutlierParams { disease_id, year };

    match epi_map_analytics::outliers::detect_outliers(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to detect outliers", &e),
    }
}

/// `GET /api/trends/rising`
///
/// Regions whose rate rose strictly across a four-year window.
pub async fn rising_trends(
    state: web::Data<AppState>,
    params: web::Query<TrendsQueryParams>,
) -> HttpResponse {
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(start_year) = params.start_year else {
        return bad_request("startYear is required");
    };
    let Some(end_year) = params.end_year else {
        return bad_request("endYear is required");
    };

    let op_params = RisingTrendParams {
        disease_id,
        start_year,
        end_year,
    };

    match epi_map_analytics::trends::rising_trends(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to detect rising trends", &e),
    }
}

/// `GET /api/demographics/exposure`
///
/// Share of cases vs share of population per demographic group.
pub async fn demographic_exposure(
    state: web::Data<AppState>,
    params: web::Query<ExposureQueryParams>,
) -> HttpResponse {
    let Some(region_name) = non_empty(params.region_name.as_deref()) else {
        return bad_request("regionName is required");
    };
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(year) = params.year else {
        return bad_request("year is required");
    };
    let dimension = match parse_dimension(params.dimension.as_deref()) {
        Ok(dimension) => dimension,
        Err(response) => return response,
    };

    let op_params = ExposureParams {
        region_name,
        disease_id,
        year,
        dimension,
    };

    match epi_map_analytics::exposure::exposure_breakdown(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to compute exposure", &e),
    }
}

/// `GET /api/compare`
///
/// Region-vs-national rate series over a year range.
pub async fn compare(
    state: web::Data<AppState>,
    params: web::Query<CompareQueryParams>,
) -> HttpResponse {
    let Some(region_name) = non_empty(params.region_name.as_deref()) else {
        return bad_request("regionName is required");
    };
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(start_year) = params.start_year else {
        return bad_request("startYear is required");
    };
    let Some(end_year) = params.end_year else {
        return bad_request("endYear is required");
    };

    let op_params = CompareParams {
        region_name,
        disease_id,
        start_year,
        end_year,
    };

    match epi_map_analytics::compare::compare_region_to_national(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to compare rates", &e),
    }
}

/// `GET /api/deaths/rate`
///
/// Death rate for one demographic group with a monthly breakdown.
pub async fn death_rate(
    state: web::Data<AppState>,
    params: web::Query<DeathRateQueryParams>,
) -> HttpResponse {
    let Some(disease_id) = params.disease_id else {
        return bad_request("diseaseId is required");
    };
    let Some(year) = params.year else {
        return bad_request("year is required");
    };
    let dimension = match parse_dimension(params.dimension.as_deref()) {
        Ok(dimension) => dimension,
        Err(response) => return response,
    };
    let Some(value) = non_empty(params.value.as_deref()) else {
        return bad_request("value is required");
    };

    let op_params = DeathRateParams {
        disease_id,
        year,
        dimension,
        value,
    };

    match epi_map_analytics::deaths::death_rate(
        state.db.as_ref(),
        state.population_edge_year,
        &op_params,
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_error_response("Failed to compute death rate", &e),
    }
}

/// Parses a comma-separated disease ID list, rejecting malformed tokens.
fn parse_disease_ids(raw: Option<&str>) -> Result<Vec<i32>, HttpResponse> {
    let Some(raw) = non_empty(raw) else {
        return Err(bad_request("diseaseIds is required"));
    };

    let mut ids = Vec::new();
    for token in raw.split(',') {
        match token.trim().parse::<i32>() {
            Ok(id) => ids.push(id),
            Err(_) => {
                return Err(bad_request(&format!(
                    "diseaseIds must be a comma-separated list of integers, got '{token}'"
                )));
            }
        }
    }

    Ok(ids)
}

/// Parses a demographic dimension tag against the closed enum.
fn parse_dimension(raw: Option<&str>) -> Result<DemographicDimension, HttpResponse> {
    let valid_tags = DemographicDimension::all()
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");

    let Some(raw) = non_empty(raw) else {
        return Err(bad_request(&format!(
            "dimension is required (one of {valid_tags})"
        )));
    };

    raw.parse::<DemographicDimension>().map_err(|_| {
        bad_request(&format!(
            "dimension must be one of {valid_tags}, got '{raw}'"
        ))
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

/// Maps an analytics failure onto the HTTP error taxonomy.
fn analytics_error_response(context: &str, err: &AnalyticsError) -> HttpResponse {
    match err {
        AnalyticsError::Validation { message } => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
        }
        AnalyticsError::NotFound { message } => {
            HttpResponse::NotFound().json(serde_json::json!({ "error": message }))
        }
        AnalyticsError::Database(_) | AnalyticsError::Conversion { .. } => {
            log::error!("{context}: {err}");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": context }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_multiple_disease_ids() {
        assert_eq!(parse_disease_ids(Some("3")).unwrap(), vec![3]);
        assert_eq!(parse_disease_ids(Some("3, 7,11")).unwrap(), vec![3, 7, 11]);
    }

    #[test]
    fn rejects_missing_or_malformed_disease_ids() {
        assert!(parse_disease_ids(None).is_err());
        assert!(parse_disease_ids(Some("")).is_err());
        assert!(parse_disease_ids(Some("3,x")).is_err());
    }

    #[test]
    fn parses_dimension_tags() {
        assert_eq!(
            parse_dimension(Some("SEX")).unwrap(),
            DemographicDimension::Sex
        );
        assert!(parse_dimension(Some("HEIGHT")).is_err());
        assert!(parse_dimension(None).is_err());
    }

    #[test]
    fn non_empty_trims_and_filters() {
        assert_eq!(non_empty(Some(" Avalon ")), Some("Avalon".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
