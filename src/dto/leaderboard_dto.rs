use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalLeaderboardEntry {
    pub rank: i32,
    pub username: String,
    pub display_name: Option<String>,
    pub total_score: i64,
    pub total_quizzes_completed: i32,
    pub average_score_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalLeaderboardResponse {
    pub leaderboard: Vec<GlobalLeaderboardEntry>,
    pub total_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizLeaderboardEntry {
    pub rank: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub score: i32,
    pub total_points: i32,
    pub percentage: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizLeaderboardResponse {
    pub quiz_id: i64,
    pub quiz_title: String,
    pub leaderboard: Vec<QuizLeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub username: String,
    pub display_name: Option<String>,
    pub total_score: i64,
    pub total_quizzes_completed: i32,
    pub average_score_percentage: f64,
    pub rank: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: ProfileView,
    pub recent_attempts: Vec<crate::dto::quiz_dto::AttemptView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatusResponse {
    pub status: String,
    pub next_fire_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerActionRequest {
    pub action: String,
}
