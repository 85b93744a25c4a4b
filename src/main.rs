mod auth;
mod config;
mod db;
mod error;
mod extractors;
mod follow;
mod posts;
mod routes;
mod state;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::follow::repository::SqliteFollowRepository;
use crate::posts::repository::SqlitePostRepository;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Build app state
    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
        posts: Arc::new(SqlitePostRepository::new(pool.clone())),
        follows: Arc::new(SqliteFollowRepository::new(pool)),
    };

    // Build router
    let mut app = Router::new()
        .route("/", get(routes::home::index))
        .route("/assets/{*path}", get(routes::assets::serve))
        .merge(routes::auth::router())
        .merge(routes::posts::router())
        .merge(routes::profile::router());

    // Test-only seed endpoint: creates a user + session, returns session cookie
    if std::env::var("MURMUR_TEST_SEED").is_ok() {
        app = app.route("/test/seed", get(test_seed));
    }

    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct SeedQuery {
    username: Option<String>,
}

/// Test-only: seed a user + session and return the session cookie.
/// Only mounted when MURMUR_TEST_SEED env var is set.
async fn test_seed(
    State(state): State<AppState>,
    Query(query): Query<SeedQuery>,
) -> impl IntoResponse {
    let username = query.username.unwrap_or_else(|| "testuser".to_string());

    let user = match users::find_by_username(&state.db, &username).unwrap() {
        Some(user) => user,
        None => {
            let hash = bcrypt::hash("password", bcrypt::DEFAULT_COST).unwrap();
            users::create(&state.db, &username, "seed@example.com", &hash)
                .unwrap()
                .unwrap()
        }
    };

    let token =
        auth::session::create_session(&state.db, &user.id, state.config.auth.session_hours)
            .unwrap();

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        format!(
            "{{\"user_id\":\"{}\",\"username\":\"{}\"}}",
            user.id, user.username
        ),
    )
}
