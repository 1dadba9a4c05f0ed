use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ExamSettings;
use crate::engine::exam_clock;
use crate::engine::scoring::{Answers, ScoreCard};
use crate::models::domain::exam_question::ExamQuestion;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Scheduled => "SCHEDULED",
            ExamStatus::InProgress => "IN_PROGRESS",
            ExamStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path closed an exam: the learner's submit or the deadline.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionSource {
    Learner,
    Deadline,
}

/// One attempt at the final certification exam.
///
/// `SCHEDULED -> IN_PROGRESS -> COMPLETED`, never backwards. A retake is a new
/// row. `active` is true exactly while the row is SCHEDULED or IN_PROGRESS and
/// backs the one-current-exam-per-learner-and-course index.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExamSchedule {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub enrollment_id: String,
    pub status: ExamStatus,
    pub active: bool,
    pub question_count: i32,
    pub duration_minutes: i64,
    pub passing_score: i16,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions: Vec<ExamQuestion>,
    #[serde(default)]
    pub answers: Answers,
    pub score: Option<i16>,
    pub correct_count: Option<i32>,
    pub total_questions: Option<i32>,
    pub passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<SubmissionSource>,
}

impl ExamSchedule {
    pub fn new(user_id: &str, course_id: &str, enrollment_id: &str, settings: &ExamSettings) -> Self {
        ExamSchedule {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            enrollment_id: enrollment_id.to_string(),
            status: ExamStatus::Scheduled,
            active: true,
            question_count: settings.question_count,
            duration_minutes: settings.duration_minutes,
            passing_score: settings.passing_score,
            scheduled_at: Utc::now(),
            started_at: None,
            deadline_at: None,
            questions: Vec::new(),
            answers: Answers::new(),
            score: None,
            correct_count: None,
            total_questions: None,
            passed: None,
            completed_at: None,
            submitted_by: None,
        }
    }

    /// Authoritative end of the session, derived from `started_at`.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.started_at
            .map(|started| exam_clock::deadline(started, self.duration_minutes))
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ExamStatus::InProgress
            && self
                .deadline()
                .map(|deadline| exam_clock::is_expired(deadline, now))
                .unwrap_or(false)
    }

    pub fn score_card(&self) -> Option<ScoreCard> {
        match (self.score, self.correct_count, self.total_questions, self.passed) {
            (Some(score), Some(correct_count), Some(total_questions), Some(passed)) => {
                Some(ScoreCard {
                    correct_count,
                    total_questions,
                    score,
                    passing_score: self.passing_score,
                    passed,
                })
            }
            _ => None,
        }
    }

    pub fn has_passed(&self) -> bool {
        self.status == ExamStatus::Completed && self.passed == Some(true)
    }
}

/// Fields written by the single `IN_PROGRESS -> COMPLETED` transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamCompletion {
    pub answers: Answers,
    pub card: ScoreCard,
    pub completed_at: DateTime<Utc>,
    pub submitted_by: SubmissionSource,
}

impl ExamCompletion {
    /// What the schedule looks like once this completion is applied.
    pub fn apply_to(&self, exam: &mut ExamSchedule) {
        exam.status = ExamStatus::Completed;
        exam.active = false;
        exam.answers = self.answers.clone();
        exam.score = Some(self.card.score);
        exam.correct_count = Some(self.card.correct_count);
        exam.total_questions = Some(self.card.total_questions);
        exam.passed = Some(self.card.passed);
        exam.completed_at = Some(self.completed_at);
        exam.submitted_by = Some(self.submitted_by);
    }
}
