use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Derived aggregates over a user's completed, non-AI attempts.
/// `rank` is 0 while the profile has no completed quizzes or has not been
/// picked up by a rank recomputation yet.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub total_score: i64,
    pub total_quizzes_completed: i32,
    pub average_score_percentage: f64,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
