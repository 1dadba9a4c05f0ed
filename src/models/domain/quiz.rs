use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_question::QuizQuestion;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub topic_id: String, // exactly one quiz per topic
    pub course_id: String,
    pub title: Option<String>,
    pub passing_score: i16, // percentage
    pub questions: Vec<QuizQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(
        course_id: &str,
        topic_id: &str,
        passing_score: i16,
        mut questions: Vec<QuizQuestion>,
    ) -> Self {
        questions.sort_by_key(|q| q.order);
        Quiz {
            id: Uuid::new_v4().to_string(),
            topic_id: topic_id.to_string(),
            course_id: course_id.to_string(),
            title: None,
            passing_score,
            questions,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Write-time schema check; stored quizzes are trusted to have passed it.
    pub fn validate(&self) -> AppResult<()> {
        if !(0..=100).contains(&self.passing_score) {
            return Err(AppError::ValidationError(format!(
                "Passing score must be between 0 and 100, got {}",
                self.passing_score
            )));
        }
        if self.questions.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Quiz for topic '{}' has no questions",
                self.topic_id
            )));
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
            question.validate()?;
        }
        Ok(())
    }
}
