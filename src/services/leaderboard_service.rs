use crate::dto::leaderboard_dto::{
    GlobalLeaderboardEntry, GlobalLeaderboardResponse, QuizLeaderboardEntry,
    QuizLeaderboardResponse,
};
use crate::error::{Error, Result};
use crate::models::attempt::{format_time_taken, percentage_of};
use crate::models::quiz::Quiz;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct RankedProfileRow {
    rank: i32,
    username: String,
    display_name: Option<String>,
    total_score: i64,
    total_quizzes_completed: i32,
    average_score_percentage: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct QuizAttemptRow {
    username: String,
    display_name: Option<String>,
    score: i32,
    total_points: i32,
    completed_at: Option<DateTime<Utc>>,
    time_taken_seconds: Option<i32>,
}

#[derive(Clone)]
pub struct LeaderboardService {
    pool: PgPool,
}

impl LeaderboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Top of the global leaderboard by persisted rank. Profiles that
    /// qualified after the last recomputation (rank still 0) show up once the
    /// next refresh lands.
    pub async fn global(&self, limit: i64) -> Result<GlobalLeaderboardResponse> {
        let rows: Vec<RankedProfileRow> = sqlx::query_as(
            r#"
            SELECT p.rank, u.username, u.display_name,
                   p.total_score, p.total_quizzes_completed, p.average_score_percentage
            FROM user_profiles p
            JOIN users u ON u.id = p.user_id
            WHERE p.rank > 0
            ORDER BY p.rank
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let total_users: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM user_profiles WHERE total_quizzes_completed > 0"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(GlobalLeaderboardResponse {
            leaderboard: rows
                .into_iter()
                .map(|r| GlobalLeaderboardEntry {
                    rank: r.rank,
                    username: r.username,
                    display_name: r.display_name,
                    total_score: r.total_score,
                    total_quizzes_completed: r.total_quizzes_completed,
                    average_score_percentage: r.average_score_percentage,
                })
                .collect(),
            total_users,
        })
    }

    /// Per-quiz standing over completed attempts: score descending, earlier
    /// completion first on ties. Positions are per-quiz and independent of
    /// the global profile rank.
    pub async fn for_quiz(&self, quiz_id: i64, limit: i64) -> Result<QuizLeaderboardResponse> {
        let quiz: Option<Quiz> = sqlx::query_as(
            r#"
            SELECT * FROM quizzes
            WHERE id = $1 AND is_active = TRUE AND is_ai_generated = FALSE
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(quiz) = quiz else {
            return Err(Error::QuizNotFound);
        };

        let rows: Vec<QuizAttemptRow> = sqlx::query_as(
            r#"
            SELECT u.username, u.display_name,
                   a.score, a.total_points, a.completed_at, a.time_taken_seconds
            FROM quiz_attempts a
            JOIN users u ON u.id = a.user_id
            WHERE a.quiz_id = $1 AND a.is_completed = TRUE
            ORDER BY a.score DESC, a.completed_at ASC
            LIMIT $2
            "#,
        )
        .bind(quiz.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let leaderboard = rows
            .into_iter()
            .enumerate()
            .map(|(index, r)| QuizLeaderboardEntry {
                rank: index as i64 + 1,
                username: r.username,
                display_name: r.display_name,
                score: r.score,
                total_points: r.total_points,
                percentage: percentage_of(r.score, r.total_points),
                completed_at: r.completed_at,
                time_taken: format_time_taken(r.time_taken_seconds),
            })
            .collect();

        Ok(QuizLeaderboardResponse {
            quiz_id: quiz.id,
            quiz_title: quiz.title,
            leaderboard,
        })
    }
}
