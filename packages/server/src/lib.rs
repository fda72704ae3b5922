#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the epi-map dashboard.
//!
//! Serves the analytical REST API over the star schema plus the static
//! dashboard bundle. Each analytical route validates its parameters,
//! delegates to one operation in `epi_map_analytics`, and serializes
//! the typed result to JSON.

mod handlers;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use epi_map_database::{db, queries, run_migrations};
use std::sync::Arc;
use switchy_database::Database;

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    /// The latest year with population data, resolved once at startup.
    /// Every analytical operation clamps its requested year to this
    /// edge when joining population.
    pub population_edge_year: i32,
}

/// Starts the epi-map API server.
///
/// Connects to the Postgres database, runs migrations, resolves the
/// population edge year, and starts the Actix-Web HTTP server. This is
/// a regular async function — the caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection fails, migrations fail, or the
/// population edge year cannot be resolved from either the
/// `POPULATION_EDGE_YEAR` environment variable or the
/// `population_by_year` table.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .expect("Failed to connect to database");

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .expect("Failed to run migrations");

    // The year-fallback edge is a single configured value: an explicit
    // override wins, otherwise it is the latest loaded population year.
    let population_edge_year = match std::env::var("POPULATION_EDGE_YEAR")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        Some(year) => year,
        None => queries::latest_population_year(db_conn.as_ref())
            .await
            .expect("Failed to query the latest population year")
            .expect("population_by_year is empty and POPULATION_EDGE_YEAR is not set"),
    };

    log::info!("Population edge year: {population_edge_year}");

    let state = web::Data::new(AppState {
        db: Arc::from(db_conn),
        population_edge_year,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/regions", web::get().to(handlers::regions))
                    .route("/diseases", web::get().to(handlers::diseases))
                    .route("/rates", web::get().to(handlers::rates))
                    .route("/rates/windowMax", web::get().to(handlers::window_max))
                    .route("/outliers", web::get().to(handlers::outliers))
                    .route("/trends/rising", web::get().to(handlers::rising_trends))
                    .route("/compare", web::get().to(handlers::compare))
                    .route(
                        "/demographics/estimate",
                        web::get().to(handlers::demographic_estimate),
                    )
                    .route(
                        "/demographics/exposure",
                        web::get().to(handlers::demographic_exposure),
                    )
                    .route("/deaths/rate", web::get().to(handlers::death_rate)),
            )
            // Serve dashboard static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
