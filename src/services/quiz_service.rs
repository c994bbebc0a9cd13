use crate::dto::quiz_dto::{
    ChoiceView, GenerateQuizRequest, GeneratedQuiz, QuestionView, QuizDetail, QuizSummary,
};
use crate::error::{Error, Result};
use crate::models::choice::Choice;
use crate::models::question::{Difficulty, Question};
use crate::models::quiz::Quiz;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::thread_rng;
use sqlx::PgPool;
use std::collections::HashMap;

#[derive(Debug, Clone, sqlx::FromRow)]
struct QuizWithCount {
    id: i64,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
    question_count: i64,
}

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self) -> Result<Vec<QuizSummary>> {
        let rows: Vec<QuizWithCount> = sqlx::query_as(
            r#"
            SELECT q.id, q.title, q.description, q.created_at, COUNT(qs.id) AS question_count
            FROM quizzes q
            LEFT JOIN questions qs ON qs.quiz_id = q.id
            WHERE q.is_active = TRUE
            GROUP BY q.id
            ORDER BY q.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| QuizSummary {
                id: r.id,
                title: r.title,
                description: r.description,
                created_at: r.created_at,
                question_count: r.question_count,
            })
            .collect())
    }

    pub async fn get_detail(&self, quiz_id: i64) -> Result<QuizDetail> {
        let quiz: Option<Quiz> =
            sqlx::query_as(r#"SELECT * FROM quizzes WHERE id = $1 AND is_active = TRUE"#)
                .bind(quiz_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(quiz) = quiz else {
            return Err(Error::QuizNotFound);
        };

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
            ORDER BY c.id
            "#,
        )
        .bind(quiz.id)
        .fetch_all(&self.pool)
        .await?;

        let total_points = questions.iter().map(|q| q.points).sum();
        let questions = build_question_views(questions, choices);

        Ok(QuizDetail {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            created_at: quiz.created_at,
            total_points,
            questions,
        })
    }

    /// Builds an ad-hoc quiz by sampling stored questions whose quiz title
    /// matches the category. Nothing is persisted; the caller records the
    /// result through the external-result path if at all.
    pub async fn generate_custom(&self, req: &GenerateQuizRequest) -> Result<GeneratedQuiz> {
        let difficulty = match &req.difficulty {
            Some(raw) => Some(Difficulty::parse(raw).ok_or_else(|| {
                Error::BadRequest(format!(
                    "Invalid difficulty \"{}\". Use easy, medium or hard",
                    raw
                ))
            })?),
            None => None,
        };
        let requested = req.question_count.unwrap_or(10).clamp(1, 50) as usize;

        let candidates: Vec<Question> = sqlx::query_as(
            r#"
            SELECT qs.* FROM questions qs
            JOIN quizzes q ON q.id = qs.quiz_id
            WHERE q.is_active = TRUE
              AND q.title ILIKE '%' || $1 || '%'
              AND ($2::text IS NULL OR qs.difficulty = $2)
            "#,
        )
        .bind(&req.category)
        .bind(difficulty.map(Difficulty::as_str))
        .fetch_all(&self.pool)
        .await?;

        if candidates.is_empty() {
            let detail = match difficulty {
                Some(d) => format!(
                    "No questions found for category \"{}\" with difficulty \"{}\"",
                    req.category,
                    d.as_str()
                ),
                None => format!("No questions found for category \"{}\"", req.category),
            };
            return Err(Error::NotFound(detail));
        }

        let selected: Vec<Question> = {
            let mut rng = thread_rng();
            candidates
                .choose_multiple(&mut rng, requested.min(candidates.len()))
                .cloned()
                .collect()
        };

        let ids: Vec<i64> = selected.iter().map(|q| q.id).collect();
        let choices: Vec<Choice> =
            sqlx::query_as(r#"SELECT * FROM choices WHERE question_id = ANY($1) ORDER BY id"#)
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?;

        let total_points = selected.iter().map(|q| q.points).sum();
        let level = match difficulty {
            Some(d) => {
                let mut label = d.as_str().to_string();
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!(" - {} Level", label)
            }
            None => " - Mixed Level".to_string(),
        };

        let mut questions = build_question_views(selected, choices);
        for (index, question) in questions.iter_mut().enumerate() {
            question.position = index as i32 + 1;
        }

        Ok(GeneratedQuiz {
            id: format!(
                "custom_{}_{}",
                req.category.to_lowercase().replace(' ', "_"),
                questions.len()
            ),
            title: format!("{}{}", req.category, level),
            description: format!(
                "Custom quiz with {} questions from {}",
                questions.len(),
                req.category
            ),
            total_points,
            is_ai_generated: false,
            questions,
        })
    }
}

fn build_question_views(questions: Vec<Question>, choices: Vec<Choice>) -> Vec<QuestionView> {
    let mut by_question: HashMap<i64, Vec<ChoiceView>> = HashMap::new();
    for choice in choices {
        by_question
            .entry(choice.question_id)
            .or_default()
            .push(ChoiceView {
                id: choice.id,
                choice_text: choice.choice_text,
                is_correct: choice.is_correct,
            });
    }

    questions
        .into_iter()
        .map(|q| QuestionView {
            id: q.id,
            question_text: q.question_text,
            question_type: q.question_type,
            difficulty: q.difficulty,
            points: q.points,
            position: q.position,
            choices: by_question.remove(&q.id).unwrap_or_default(),
        })
        .collect()
}
