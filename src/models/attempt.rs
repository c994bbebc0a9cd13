use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub score: i32,
    pub total_points: i32,
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i32>,
}

impl QuizAttempt {
    pub fn percentage(&self) -> f64 {
        percentage_of(self.score, self.total_points)
    }

    pub fn time_taken_formatted(&self) -> String {
        format_time_taken(self.time_taken_seconds)
    }
}

/// Score as a percentage of total points, rounded to two decimals; 0 when the
/// attempt has no points to earn.
pub fn percentage_of(score: i32, total_points: i32) -> f64 {
    if total_points > 0 {
        let pct = score as f64 / total_points as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// "MM:SS" rendering of a duration; missing or zero durations render "00:00".
pub fn format_time_taken(seconds: Option<i32>) -> String {
    match seconds {
        Some(s) if s > 0 => format!("{:02}:{:02}", s / 60, s % 60),
        _ => "00:00".to_string(),
    }
}
