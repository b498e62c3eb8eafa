use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod core;
mod db;
mod error;
mod handlers;
mod models;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sleepdiary_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let state = AppState {
        db,
        config: config.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let protected_routes = Router::new()
        // Diaries
        .route("/api/diaries", get(handlers::diaries::list_diaries))
        .route("/api/diaries", post(handlers::diaries::create_diary))
        .route("/api/diaries/:id", get(handlers::diaries::get_diary))
        .route("/api/diaries/:id", put(handlers::diaries::update_diary))
        .route("/api/diaries/:id", delete(handlers::diaries::delete_diary))
        // Time grid
        .route("/api/diaries/:id/grid", get(handlers::grid::get_diary_grid))
        // Records
        .route("/api/records", post(handlers::records::create_record))
        .route("/api/records", get(handlers::records::list_records))
        .route("/api/records/:id", put(handlers::records::update_record))
        .route("/api/records/:id", delete(handlers::records::delete_record))
        // Master data
        .route("/api/sleep-states", get(handlers::records::list_sleep_states))
        .route("/api/meal-types", get(handlers::records::list_meal_types))
        // Statistics
        .route("/api/statistics", get(handlers::statistics::get_statistics))
        .route(
            "/api/statistics/weekly",
            get(handlers::statistics::get_weekly_statistics),
        )
        .route(
            "/api/statistics/monthly",
            get(handlers::statistics::get_monthly_statistics),
        )
        .route(
            "/api/dashboard/summary",
            get(handlers::statistics::dashboard_summary),
        )
        // Export
        .route(
            "/api/export/records.csv",
            get(handlers::export::export_records_csv),
        )
        .route(
            "/api/diaries/:id/pdf-data",
            get(handlers::export::export_diary_pdf_data),
        )
        // Preferences
        .route(
            "/api/preferences",
            get(handlers::preferences::get_preference),
        )
        .route(
            "/api/preferences",
            put(handlers::preferences::upsert_preference),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
