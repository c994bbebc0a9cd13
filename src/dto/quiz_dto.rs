use crate::models::answer::Answer;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub question_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceView {
    pub id: i64,
    pub choice_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: i64,
    pub question_text: String,
    pub question_type: String,
    pub difficulty: String,
    pub points: i32,
    pub position: i32,
    pub choices: Vec<ChoiceView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub total_points: i32,
    pub questions: Vec<QuestionView>,
}

// Unknown question or choice ids are dropped during scoring, not rejected
// up front.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
    pub text_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub quiz_id: i64,
    #[validate(nested)]
    pub answers: Vec<SubmittedAnswer>,
    #[validate(range(min = 0))]
    pub time_taken_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizResponse {
    pub attempt_id: i64,
    pub score: i32,
    pub total_points: i32,
    pub percentage: f64,
    pub rank: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(length(min = 1))]
    pub category: String,
    pub difficulty: Option<String>,
    pub question_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub total_points: i32,
    pub is_ai_generated: bool,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExternalResultRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(length(min = 1))]
    pub quiz_title: String,
    #[validate(range(min = 0))]
    pub score: i32,
    #[validate(range(min = 0))]
    pub total_points: i32,
    pub time_taken_seconds: Option<i32>,
    pub is_ai_generated: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalResultResponse {
    pub message: String,
    pub attempt_id: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: f64,
    pub is_completed: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub time_taken_seconds: Option<i32>,
    pub time_taken: String,
    pub is_ai_generated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CleanupRequest {
    /// YYYY-MM-DD; attempts started before this date are removed.
    #[validate(length(min = 1))]
    pub cutoff_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub message: String,
    pub deleted_attempts: u64,
    pub deleted_answers: u64,
    pub profiles_updated: u64,
}
