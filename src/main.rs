use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use rentora::config::AppConfig;
use rentora::db;
use rentora::handlers;
use rentora::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/users/register", post(handlers::users::register))
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/listings", post(handlers::listings::create_listing))
        .route("/api/listings", get(handlers::listings::list_listings))
        .route("/api/listings/:id", get(handlers::listings::get_listing))
        .route("/api/listings/:id", put(handlers::listings::update_listing))
        .route(
            "/api/listings/:id",
            delete(handlers::listings::delete_listing),
        )
        .route(
            "/api/listings/:id/toggle_active",
            post(handlers::listings::toggle_active),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/approve",
            post(handlers::bookings::approve_booking),
        )
        .route(
            "/api/bookings/:id/reject",
            post(handlers::bookings::reject_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/complete",
            post(handlers::bookings::complete_booking),
        )
        .route("/api/reviews", post(handlers::reviews::create_review))
        .route("/api/reviews", get(handlers::reviews::list_reviews))
        .route("/api/reviews/:id", get(handlers::reviews::get_review))
        .route("/api/reviews/:id", put(handlers::reviews::update_review))
        .route(
            "/api/reviews/:id",
            delete(handlers::reviews::delete_review),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
