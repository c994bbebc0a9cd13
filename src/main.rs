use axum::{
    routing::{get, post},
    Router,
};
use quiz_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::cors::permissive_cors,
    routes,
    scheduler::LeaderboardScheduler,
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    if config.scheduler_autostart {
        app_state.scheduler.start();
    }

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/quizzes", get(routes::quiz::list_quizzes))
        .route("/api/quizzes/generate", post(routes::quiz::generate_quiz))
        .route("/api/quizzes/:id", get(routes::quiz::get_quiz))
        .route("/api/submit", post(routes::quiz::submit_quiz))
        .route(
            "/api/attempts/:user_id",
            get(routes::profile::list_user_attempts),
        )
        .route(
            "/api/leaderboard",
            get(routes::leaderboard::global_leaderboard),
        )
        .route(
            "/api/leaderboard/quiz/:quiz_id",
            get(routes::leaderboard::quiz_leaderboard),
        )
        .route("/api/profile/:user_id", get(routes::profile::user_profile))
        .route(
            "/api/results/external",
            post(routes::quiz::save_external_result),
        )
        .route("/api/admin/cleanup", post(routes::admin::cleanup_quiz_data))
        .route(
            "/api/scheduler",
            get(routes::scheduler::scheduler_status).post(routes::scheduler::scheduler_control),
        )
        .with_state(app_state.clone())
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(app_state.scheduler.clone()))
        .await?;

    Ok(())
}

async fn shutdown_signal(scheduler: LeaderboardScheduler) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
    scheduler.stop();
}
