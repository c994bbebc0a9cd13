use crate::error::Result;
use sqlx::PgPool;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankRow {
    pub id: i64,
    pub user_id: i64,
    pub total_score: i64,
    pub average_score_percentage: f64,
}

/// Total order over qualifying profiles: total score descending, then average
/// percentage descending, then user id ascending as the deterministic
/// tiebreaker.
pub fn rank_order(a: &RankRow, b: &RankRow) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then(
            b.average_score_percentage
                .partial_cmp(&a.average_score_percentage)
                .unwrap_or(Ordering::Equal),
        )
        .then(a.user_id.cmp(&b.user_id))
}

#[derive(Clone)]
pub struct RankService {
    pool: PgPool,
    refresh_in_flight: Arc<AtomicBool>,
}

impl RankService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            refresh_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Full, non-incremental rank rebuild: every rank is cleared to 0, then
    /// profiles with at least one completed quiz get dense ranks 1..N in one
    /// transaction. Returns N.
    pub async fn recompute_all(&self) -> Result<i64> {
        let mut rows: Vec<RankRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_score, average_score_percentage
            FROM user_profiles
            WHERE total_quizzes_completed > 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.sort_by(rank_order);

        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"UPDATE user_profiles SET rank = 0 WHERE rank <> 0"#)
            .execute(&mut *tx)
            .await?;

        for (index, row) in rows.iter().enumerate() {
            sqlx::query(r#"UPDATE user_profiles SET rank = $1 WHERE id = $2"#)
                .bind(index as i32 + 1)
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(rows.len() as i64)
    }

    /// The submitter's rank against the live snapshot: one plus the number of
    /// qualifying profiles that order strictly ahead of them. 0 when the user
    /// has no completed quizzes yet.
    pub async fn live_rank(&self, user_id: i64) -> Result<i32> {
        let me: Option<RankRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, total_score, average_score_percentage
            FROM user_profiles
            WHERE user_id = $1 AND total_quizzes_completed > 0
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(me) = me else {
            return Ok(0);
        };

        let ahead: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_profiles
            WHERE total_quizzes_completed > 0
              AND (total_score > $1
                   OR (total_score = $1 AND average_score_percentage > $2)
                   OR (total_score = $1 AND average_score_percentage = $2 AND user_id < $3))
            "#,
        )
        .bind(me.total_score)
        .bind(me.average_score_percentage)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ahead as i32 + 1)
    }

    /// Requests a background rank rebuild. At most one refresh runs at a
    /// time; a request arriving while one is in flight is dropped, not
    /// queued. The periodic scheduler remains the consistency backstop.
    pub fn refresh_async(&self) {
        if self
            .refresh_in_flight
            .compare_exchange(
                false,
                true,
                AtomicOrdering::SeqCst,
                AtomicOrdering::SeqCst,
            )
            .is_err()
        {
            tracing::debug!("rank refresh already in flight, dropping request");
            return;
        }

        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.recompute_all().await {
                tracing::error!(error = ?e, "background rank refresh failed");
            }
            service
                .refresh_in_flight
                .store(false, AtomicOrdering::SeqCst);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: i64, total_score: i64, avg: f64) -> RankRow {
        RankRow {
            id: user_id + 100,
            user_id,
            total_score,
            average_score_percentage: avg,
        }
    }

    #[test]
    fn orders_by_score_then_average_then_user_id() {
        let mut rows = vec![
            row(3, 10, 50.0),
            row(1, 10, 50.0),
            row(2, 10, 80.0),
            row(4, 20, 10.0),
        ];
        rows.sort_by(rank_order);

        let users: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
        assert_eq!(users, vec![4, 2, 1, 3]);
    }

    #[test]
    fn tied_profiles_break_on_lower_user_id() {
        let mut rows = vec![row(9, 5, 42.0), row(2, 5, 42.0), row(7, 5, 42.0)];
        rows.sort_by(rank_order);
        let users: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
        assert_eq!(users, vec![2, 7, 9]);
    }

    #[test]
    fn ordering_is_stable_across_repeated_sorts() {
        let original = vec![
            row(5, 12, 33.33),
            row(6, 12, 33.33),
            row(1, 3, 99.0),
            row(8, 40, 10.0),
        ];
        let mut first = original.clone();
        first.sort_by(rank_order);
        let mut second = first.clone();
        second.sort_by(rank_order);

        let a: Vec<i64> = first.iter().map(|r| r.user_id).collect();
        let b: Vec<i64> = second.iter().map(|r| r.user_id).collect();
        assert_eq!(a, b);
    }
}
