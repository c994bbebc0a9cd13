use crate::dto::quiz_dto::SubmittedAnswer;
use crate::models::choice::Choice;
use crate::models::question::Question;
use std::collections::HashMap;

/// One processed submitted answer, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
    pub text_answer: String,
    pub is_correct: bool,
    pub points_earned: i32,
}

#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: i32,
    pub total_points: i32,
    pub answers: Vec<GradedAnswer>,
}

pub struct ScoreEngine;

impl ScoreEngine {
    /// Scores a submitted answer set against a quiz's questions and choices.
    ///
    /// Answers referencing a question outside the quiz are dropped without
    /// error; a choice id that does not belong to the referenced question is
    /// treated as incorrect and no choice is recorded. `total_points` covers
    /// every question in the quiz, answered or not.
    pub fn score(
        questions: &[Question],
        choices: &[Choice],
        submitted: &[SubmittedAnswer],
    ) -> ScoreOutcome {
        let questions_by_id: HashMap<i64, &Question> =
            questions.iter().map(|q| (q.id, q)).collect();
        let choices_by_id: HashMap<i64, &Choice> = choices.iter().map(|c| (c.id, c)).collect();

        let total_points: i32 = questions.iter().map(|q| q.points).sum();

        let mut score = 0;
        let mut answers = Vec::with_capacity(submitted.len());

        for entry in submitted {
            let Some(question) = questions_by_id.get(&entry.question_id) else {
                continue;
            };

            let selected = entry
                .selected_choice_id
                .and_then(|id| choices_by_id.get(&id))
                .filter(|c| c.question_id == question.id);

            let is_correct = selected.map(|c| c.is_correct).unwrap_or(false);
            let points_earned = if is_correct { question.points } else { 0 };
            score += points_earned;

            answers.push(GradedAnswer {
                question_id: question.id,
                selected_choice_id: selected.map(|c| c.id),
                text_answer: entry.text_answer.clone().unwrap_or_default(),
                is_correct,
                points_earned,
            });
        }

        ScoreOutcome {
            score,
            total_points,
            answers,
        }
    }
}
