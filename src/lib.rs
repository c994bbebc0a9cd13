pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;

use crate::scheduler::{LeaderboardRefreshJob, LeaderboardScheduler};
use crate::services::{
    attempt_service::AttemptService, leaderboard_service::LeaderboardService,
    profile_service::ProfileService, quiz_service::QuizService, rank_service::RankService,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub quiz_service: QuizService,
    pub attempt_service: AttemptService,
    pub profile_service: ProfileService,
    pub rank_service: RankService,
    pub leaderboard_service: LeaderboardService,
    pub scheduler: LeaderboardScheduler,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let quiz_service = QuizService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let profile_service = ProfileService::new(pool.clone());
        let rank_service = RankService::new(pool.clone());
        let leaderboard_service = LeaderboardService::new(pool.clone());

        let job = Arc::new(LeaderboardRefreshJob::new(
            profile_service.clone(),
            rank_service.clone(),
        ));
        let scheduler =
            LeaderboardScheduler::new(job, Duration::from_secs(config.scheduler_interval_secs));

        Self {
            pool,
            quiz_service,
            attempt_service,
            profile_service,
            rank_service,
            leaderboard_service,
            scheduler,
        }
    }
}
