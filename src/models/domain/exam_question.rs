use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_question::QuizOptions;

/// Entry of a course's final-exam question bank. Exams copy the entries they
/// draw, so later bank edits never reach a running session.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExamQuestion {
    pub id: String,
    pub course_id: String,
    pub question: String,
    #[serde(default)]
    pub options: QuizOptions,
    pub correct_answer: i32,
    pub explanation: Option<String>,
}

impl ExamQuestion {
    pub fn new(
        course_id: &str,
        question: &str,
        options: Vec<String>,
        correct_answer: i32,
    ) -> Self {
        ExamQuestion {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            question: question.to_string(),
            options: QuizOptions::new(options),
            correct_answer,
            explanation: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Exam question has no text".to_string(),
            ));
        }
        self.options.validate()?;
        if !self.options.contains_index(self.correct_answer) {
            return Err(AppError::ValidationError(format!(
                "Exam question '{}' has correct answer outside its options",
                self.id
            )));
        }
        Ok(())
    }
}
