use crate::dto::leaderboard_dto::ProfileView;
use crate::error::{Error, Result};
use crate::models::profile::UserProfile;
use crate::models::user::User;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
struct AttemptTotals {
    score: i32,
    total_points: i32,
}

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
}

impl ProfileService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recomputes one user's aggregates from their completed, non-AI attempts
    /// and upserts the profile row. Idempotent; last writer wins.
    pub async fn update_stats(&self, user_id: i64) -> Result<UserProfile> {
        let rows: Vec<AttemptTotals> = sqlx::query_as(
            r#"
            SELECT a.score, a.total_points
            FROM quiz_attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            WHERE a.user_id = $1 AND a.is_completed = TRUE AND q.is_ai_generated = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let completed = rows.len() as i32;
        let total_score: i64 = rows.iter().map(|r| r.score as i64).sum();
        let pairs: Vec<(i32, i32)> = rows.iter().map(|r| (r.score, r.total_points)).collect();
        let average = average_percentage(&pairs);

        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, total_score, total_quizzes_completed, average_score_percentage)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET total_score = EXCLUDED.total_score,
                total_quizzes_completed = EXCLUDED.total_quizzes_completed,
                average_score_percentage = EXCLUDED.average_score_percentage,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(total_score)
        .bind(completed)
        .bind(average)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Fetches the profile, creating it (with freshly computed stats) on
    /// first need.
    pub async fn get_or_create(&self, user_id: i64) -> Result<UserProfile> {
        let exists: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound("User not found".to_string()));
        }

        let existing = sqlx::query_as::<_, UserProfile>(
            r#"SELECT * FROM user_profiles WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(profile) => Ok(profile),
            None => self.update_stats(user_id).await,
        }
    }

    pub async fn profile_view(&self, user_id: i64) -> Result<ProfileView> {
        let profile = self.get_or_create(user_id).await?;
        let user: User = sqlx::query_as(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(ProfileView {
            username: user.username,
            display_name: user.display_name,
            total_score: profile.total_score,
            total_quizzes_completed: profile.total_quizzes_completed,
            average_score_percentage: profile.average_score_percentage,
            rank: profile.rank,
        })
    }

    /// Refreshes stats for every known profile; the scheduler's per-firing
    /// sweep. Returns the number of profiles touched.
    pub async fn refresh_all(&self) -> Result<u64> {
        let user_ids: Vec<i64> = sqlx::query_scalar(r#"SELECT user_id FROM user_profiles"#)
            .fetch_all(&self.pool)
            .await?;

        let mut updated = 0u64;
        for user_id in user_ids {
            self.update_stats(user_id).await?;
            updated += 1;
        }
        Ok(updated)
    }
}

/// Ratio of means: `(mean(score) / mean(total_points)) * 100`, rounded to two
/// decimals. Distinct from averaging each attempt's own percentage.
pub fn average_percentage(attempts: &[(i32, i32)]) -> f64 {
    if attempts.is_empty() {
        return 0.0;
    }
    let n = attempts.len() as f64;
    let mean_score: f64 = attempts.iter().map(|(s, _)| *s as f64).sum::<f64>() / n;
    let mean_total: f64 = attempts.iter().map(|(_, t)| *t as f64).sum::<f64>() / n;
    if mean_total <= 0.0 {
        return 0.0;
    }
    let pct = mean_score / mean_total * 100.0;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_means_not_mean_of_ratios() {
        // 5/10 and 3/5: mean(5,3)/mean(10,5) = 4/7.5 = 53.33, while the
        // per-attempt percentages (50%, 60%) would average to 55.
        let avg = average_percentage(&[(5, 10), (3, 5)]);
        assert_eq!(avg, 53.33);
        assert_ne!(avg, 55.0);
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(average_percentage(&[]), 0.0);
    }

    #[test]
    fn zero_denominators_are_zero() {
        assert_eq!(average_percentage(&[(0, 0), (0, 0)]), 0.0);
    }

    #[test]
    fn perfect_scores_are_one_hundred() {
        assert_eq!(average_percentage(&[(7, 7), (5, 5)]), 100.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        // 6/7 = 85.714... -> 85.71
        assert_eq!(average_percentage(&[(6, 7)]), 85.71);
    }
}
