use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::scoring::{Answers, ScoreCard};

/// The durable, scored quiz submission of one learner for one topic.
/// Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub enrollment_id: String,
    pub quiz_id: String,
    pub topic_id: String,
    pub answers: Answers,
    pub score: i16,
    pub passed: bool,
    pub correct_count: i32,
    pub total_questions: i32,
    pub passing_score: i16,
    pub completed_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn new(
        user_id: &str,
        enrollment_id: &str,
        quiz_id: &str,
        topic_id: &str,
        answers: Answers,
        card: &ScoreCard,
    ) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            enrollment_id: enrollment_id.to_string(),
            quiz_id: quiz_id.to_string(),
            topic_id: topic_id.to_string(),
            answers,
            score: card.score,
            passed: card.passed,
            correct_count: card.correct_count,
            total_questions: card.total_questions,
            passing_score: card.passing_score,
            completed_at: Utc::now(),
        }
    }

    pub fn score_card(&self) -> ScoreCard {
        ScoreCard {
            correct_count: self.correct_count,
            total_questions: self.total_questions,
            score: self.score,
            passing_score: self.passing_score,
            passed: self.passed,
        }
    }
}
