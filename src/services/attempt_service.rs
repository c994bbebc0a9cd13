use crate::dto::quiz_dto::{AttemptView, ExternalResultRequest, SubmitQuizRequest};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::attempt::{format_time_taken, percentage_of, QuizAttempt};
use crate::models::choice::Choice;
use crate::models::question::Question;
use crate::models::quiz::Quiz;
use crate::services::scoring::ScoreEngine;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sqlx::PgPool;
use std::collections::HashMap;

#[derive(Debug, Clone, sqlx::FromRow)]
struct AttemptWithQuiz {
    id: i64,
    quiz_id: i64,
    quiz_title: String,
    is_ai_generated: bool,
    score: i32,
    total_points: i32,
    is_completed: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    time_taken_seconds: Option<i32>,
}

impl AttemptWithQuiz {
    fn into_view(self, answers: Vec<Answer>) -> AttemptView {
        AttemptView {
            id: self.id,
            quiz_id: self.quiz_id,
            quiz_title: self.quiz_title,
            score: self.score,
            total_points: self.total_points,
            percentage: percentage_of(self.score, self.total_points),
            is_completed: self.is_completed,
            started_at: self.started_at,
            completed_at: self.completed_at,
            time_taken_seconds: self.time_taken_seconds,
            time_taken: format_time_taken(self.time_taken_seconds),
            is_ai_generated: self.is_ai_generated,
            answers,
        }
    }
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Scores a submission and finalizes the attempt. The attempt row, its
    /// answers and the completion flip are committed as one transaction; any
    /// failure leaves the attempt incomplete with no answers, so a retry is
    /// not rejected as already completed.
    pub async fn submit(&self, req: &SubmitQuizRequest) -> Result<QuizAttempt> {
        let quiz: Option<Quiz> =
            sqlx::query_as(r#"SELECT * FROM quizzes WHERE id = $1 AND is_active = TRUE"#)
                .bind(req.quiz_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(quiz) = quiz else {
            return Err(Error::QuizNotFound);
        };
        if quiz.is_ai_generated {
            return Err(Error::SubmissionNotAllowed);
        }

        self.require_user(req.user_id).await?;

        let questions: Vec<Question> =
            sqlx::query_as(r#"SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position, id"#)
                .bind(quiz.id)
                .fetch_all(&self.pool)
                .await?;
        let choices: Vec<Choice> = sqlx::query_as(
            r#"
            SELECT c.* FROM choices c
            JOIN questions q ON q.id = c.question_id
            WHERE q.quiz_id = $1
            "#,
        )
        .bind(quiz.id)
        .fetch_all(&self.pool)
        .await?;

        let outcome = ScoreEngine::score(&questions, &choices, &req.answers);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (user_id, quiz_id, total_points)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, quiz_id) DO NOTHING
            "#,
        )
        .bind(req.user_id)
        .bind(quiz.id)
        .bind(outcome.total_points)
        .execute(&mut *tx)
        .await?;

        // total_points stays as snapshotted when the attempt was first
        // created, even if the quiz was edited since.
        let attempt: QuizAttempt = sqlx::query_as(
            r#"SELECT * FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2 FOR UPDATE"#,
        )
        .bind(req.user_id)
        .bind(quiz.id)
        .fetch_one(&mut *tx)
        .await?;

        if attempt.is_completed {
            return Err(Error::AlreadyCompleted);
        }

        for answer in &outcome.answers {
            sqlx::query(
                r#"
                INSERT INTO answers (attempt_id, question_id, selected_choice_id, text_answer, is_correct)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(attempt.id)
            .bind(answer.question_id)
            .bind(answer.selected_choice_id)
            .bind(&answer.text_answer)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        let completed: QuizAttempt = sqlx::query_as(
            r#"
            UPDATE quiz_attempts
            SET score = $1, is_completed = TRUE, completed_at = $2, time_taken_seconds = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(outcome.score)
        .bind(Utc::now())
        .bind(req.time_taken_seconds)
        .bind(attempt.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = req.user_id,
            quiz_id = quiz.id,
            score = completed.score,
            total_points = completed.total_points,
            "quiz attempt completed"
        );
        Ok(completed)
    }

    /// Records the result of an ad-hoc or AI-generated quiz for personal
    /// history. A fresh inactive quiz shell is created per result so the
    /// (user, quiz) uniqueness constraint never collides; AI-flagged results
    /// stay out of aggregates and ranking.
    pub async fn save_external_result(
        &self,
        req: &ExternalResultRequest,
    ) -> Result<QuizAttempt> {
        self.require_user(req.user_id).await?;

        if req.score > req.total_points {
            return Err(Error::BadRequest(
                "Score cannot exceed total points".to_string(),
            ));
        }

        let is_ai_generated = req.is_ai_generated.unwrap_or(true);
        let suffix: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let title = format!("{} - {}", req.quiz_title, suffix.to_lowercase());
        let description = if is_ai_generated {
            "AI-generated custom quiz, stored for personal history"
        } else {
            "Custom quiz from stored questions, stored for personal history"
        };

        let mut tx = self.pool.begin().await?;

        let quiz_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO quizzes (title, description, is_active, is_ai_generated)
            VALUES ($1, $2, FALSE, $3)
            RETURNING id
            "#,
        )
        .bind(&title)
        .bind(description)
        .bind(is_ai_generated)
        .fetch_one(&mut *tx)
        .await?;

        let attempt: QuizAttempt = sqlx::query_as(
            r#"
            INSERT INTO quiz_attempts
                (user_id, quiz_id, score, total_points, is_completed, completed_at, time_taken_seconds)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6)
            RETURNING *
            "#,
        )
        .bind(req.user_id)
        .bind(quiz_id)
        .bind(req.score)
        .bind(req.total_points)
        .bind(Utc::now())
        .bind(req.time_taken_seconds)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(attempt)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<AttemptView>> {
        self.require_user(user_id).await?;

        let rows: Vec<AttemptWithQuiz> = sqlx::query_as(
            r#"
            SELECT a.id, a.quiz_id, q.title AS quiz_title, q.is_ai_generated,
                   a.score, a.total_points, a.is_completed,
                   a.started_at, a.completed_at, a.time_taken_seconds
            FROM quiz_attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            WHERE a.user_id = $1
            ORDER BY a.started_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let answers: Vec<Answer> = sqlx::query_as(
            r#"
            SELECT an.* FROM answers an
            JOIN quiz_attempts a ON a.id = an.attempt_id
            WHERE a.user_id = $1
            ORDER BY an.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_attempt: HashMap<i64, Vec<Answer>> = HashMap::new();
        for answer in answers {
            by_attempt.entry(answer.attempt_id).or_default().push(answer);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let answers = by_attempt.remove(&row.id).unwrap_or_default();
                row.into_view(answers)
            })
            .collect())
    }

    /// Most recent completed attempts. AI-generated quizzes are included;
    /// they are part of personal history even though they never count toward
    /// aggregates.
    pub async fn recent_completed(&self, user_id: i64, limit: i64) -> Result<Vec<AttemptView>> {
        let rows: Vec<AttemptWithQuiz> = sqlx::query_as(
            r#"
            SELECT a.id, a.quiz_id, q.title AS quiz_title, q.is_ai_generated,
                   a.score, a.total_points, a.is_completed,
                   a.started_at, a.completed_at, a.time_taken_seconds
            FROM quiz_attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            WHERE a.user_id = $1 AND a.is_completed = TRUE
            ORDER BY a.completed_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_view(Vec::new()))
            .collect())
    }

    /// Deletes attempts started before the cutoff; their answers go with
    /// them. Returns (attempts deleted, answers deleted). Callers are
    /// expected to refresh profiles and ranks afterwards.
    pub async fn delete_started_before(&self, cutoff: DateTime<Utc>) -> Result<(u64, u64)> {
        let answers_to_delete: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM answers a
            JOIN quiz_attempts t ON t.id = a.attempt_id
            WHERE t.started_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        let result = sqlx::query(r#"DELETE FROM quiz_attempts WHERE started_at < $1"#)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected(), answers_to_delete as u64))
    }

    async fn require_user(&self, user_id: i64) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar(r#"SELECT id FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}
