use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::exam_clock;
use crate::engine::quiz_session::QuizMode;
use crate::engine::scoring::{Answers, QuestionFeedback, ScoreCard};
use crate::engine::unlock_policy::{CourseSnapshot, TopicStatus};
use crate::models::domain::{
    Certificate, CertificateLevel, Course, Enrollment, EnrollmentStatus, ExamQuestion,
    ExamSchedule, ExamStatus, Quiz, QuizAttempt, QuizQuestion, SubmissionSource, Topic,
};

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct EnrollmentDto {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub progress: i16,
    pub enrolled_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentDto {
    fn from(enrollment: Enrollment) -> Self {
        EnrollmentDto {
            id: enrollment.id,
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            progress: enrollment.progress,
            enrolled_at: enrollment.enrolled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TopicProgressView {
    pub topic_id: String,
    pub title: String,
    pub sequence: i32,
    pub video_url: Option<String>,
    pub status: TopicStatus,
    pub video_watched: bool,
    pub video_progress: i16,
    pub is_completed: bool,
    pub has_quiz: bool,
}

/// Authoritative progress read model; clients refetch it after each mutation.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CourseProgressResponse {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    pub status: EnrollmentStatus,
    pub progress: i16,
    pub completed_topics: i32,
    pub total_topics: i32,
    pub exam_eligible: bool,
    pub topics: Vec<TopicProgressView>,
}

impl CourseProgressResponse {
    /// `quiz_topics` holds the ids of topics that carry a quiz.
    pub fn build(
        course: &Course,
        enrollment: &Enrollment,
        snapshot: &CourseSnapshot<'_>,
        quiz_topics: &[String],
    ) -> Self {
        let topics = snapshot
            .topics()
            .iter()
            .zip(snapshot.statuses())
            .map(|(topic, status)| {
                let progress = snapshot.progress_of(&topic.id);
                TopicProgressView {
                    topic_id: topic.id.clone(),
                    title: topic.title.clone(),
                    sequence: topic.sequence,
                    video_url: topic.video_url.clone(),
                    status,
                    video_watched: progress.map(|p| p.video_watched).unwrap_or(false),
                    video_progress: progress.map(|p| p.video_progress).unwrap_or(0),
                    is_completed: progress.map(|p| p.is_completed).unwrap_or(false),
                    has_quiz: quiz_topics.contains(&topic.id),
                }
            })
            .collect();

        CourseProgressResponse {
            enrollment_id: enrollment.id.clone(),
            course_id: course.id.clone(),
            course_title: course.title.clone(),
            status: enrollment.status,
            progress: enrollment.progress,
            completed_topics: snapshot.completed_count() as i32,
            total_topics: snapshot.topics().len() as i32,
            exam_eligible: !snapshot.topics().is_empty() && snapshot.exam_eligible(),
            topics,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PublishedTopic {
    pub id: String,
    pub title: String,
    pub sequence: i32,
    pub quiz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PublishedCourseResponse {
    pub course_id: String,
    pub title: String,
    pub topics: Vec<PublishedTopic>,
    pub exam_question_count: i32,
}

impl PublishedCourseResponse {
    pub fn new(course: &Course, topics: &[Topic], quizzes: &[Quiz], exam_question_count: usize) -> Self {
        let topics = topics
            .iter()
            .map(|topic| PublishedTopic {
                id: topic.id.clone(),
                title: topic.title.clone(),
                sequence: topic.sequence,
                quiz_id: quizzes
                    .iter()
                    .find(|q| q.topic_id == topic.id)
                    .map(|q| q.id.clone()),
            })
            .collect();

        PublishedCourseResponse {
            course_id: course.id.clone(),
            title: course.title.clone(),
            topics,
            exam_question_count: exam_question_count as i32,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionFeedbackDto {
    pub question_id: String,
    pub selected: Option<i32>,
    pub correct_answer: i32,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

impl From<QuestionFeedback> for QuestionFeedbackDto {
    fn from(feedback: QuestionFeedback) -> Self {
        QuestionFeedbackDto {
            question_id: feedback.question_id,
            selected: feedback.selected,
            correct_answer: feedback.correct_answer,
            is_correct: feedback.is_correct,
            explanation: feedback.explanation,
        }
    }
}

/// A quiz question as shown to the learner. The answer key is only filled in
/// review mode.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizQuestionView {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub order: i32,
    pub correct_answer: Option<i32>,
    pub explanation: Option<String>,
}

impl QuizQuestionView {
    fn new(question: &QuizQuestion, reveal: bool) -> Self {
        QuizQuestionView {
            id: question.id.clone(),
            question: question.question.clone(),
            options: question.options.as_slice().to_vec(),
            order: question.order,
            correct_answer: reveal.then_some(question.correct_answer),
            explanation: if reveal { question.explanation.clone() } else { None },
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizResultResponse {
    pub quiz_id: String,
    pub topic_id: String,
    pub score: i16,
    pub passed: bool,
    pub correct_count: i32,
    pub total_questions: i32,
    pub passing_score: i16,
    pub feedback: Vec<QuestionFeedbackDto>,
    /// True when this result is the durable attempt on record.
    pub recorded: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizResultResponse {
    pub fn graded(quiz: &Quiz, card: &ScoreCard, feedback: Vec<QuestionFeedback>) -> Self {
        QuizResultResponse {
            quiz_id: quiz.id.clone(),
            topic_id: quiz.topic_id.clone(),
            score: card.score,
            passed: card.passed,
            correct_count: card.correct_count,
            total_questions: card.total_questions,
            passing_score: card.passing_score,
            feedback: feedback.into_iter().map(QuestionFeedbackDto::from).collect(),
            recorded: false,
            completed_at: None,
        }
    }

    /// Rebuilds the results view from a stored attempt; feedback is
    /// recomputed against the current quiz questions.
    pub fn from_attempt(quiz: &Quiz, attempt: &QuizAttempt) -> Self {
        let card = attempt.score_card();
        let feedback = quiz
            .questions
            .iter()
            .map(|q| {
                crate::engine::scoring::feedback_for(q, attempt.answers.get(&q.id).copied())
            })
            .collect();

        QuizResultResponse {
            recorded: true,
            completed_at: Some(attempt.completed_at),
            ..Self::graded(quiz, &card, feedback)
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizForTaking {
    pub quiz_id: String,
    pub topic_id: String,
    pub title: Option<String>,
    pub passing_score: i16,
    pub mode: QuizMode,
    pub total_questions: i32,
    pub questions: Vec<QuizQuestionView>,
    /// Set when stored option data was malformed and had to be emptied.
    pub data_integrity_warning: bool,
    pub result: Option<QuizResultResponse>,
}

impl QuizForTaking {
    pub fn taking(quiz: &Quiz) -> Self {
        Self::build(quiz, QuizMode::Taking, None)
    }

    pub fn review(quiz: &Quiz, result: Option<QuizResultResponse>) -> Self {
        Self::build(quiz, QuizMode::Review, result)
    }

    fn build(quiz: &Quiz, mode: QuizMode, result: Option<QuizResultResponse>) -> Self {
        let reveal = mode == QuizMode::Review;
        QuizForTaking {
            quiz_id: quiz.id.clone(),
            topic_id: quiz.topic_id.clone(),
            title: quiz.title.clone(),
            passing_score: quiz.passing_score,
            mode,
            total_questions: quiz.total_questions() as i32,
            questions: quiz
                .questions
                .iter()
                .map(|q| QuizQuestionView::new(q, reveal))
                .collect(),
            data_integrity_warning: quiz.questions.iter().any(|q| q.options.is_malformed()),
            result,
        }
    }
}

/// `getQuizAttempt` answer; a missing attempt is not an error.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizAttemptLookup {
    pub found: bool,
    pub attempt: Option<QuizResultResponse>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AnswerEntry {
    pub question_id: String,
    pub option_index: i32,
}

fn answer_entries(answers: &Answers) -> Vec<AnswerEntry> {
    answers
        .iter()
        .map(|(question_id, option_index)| AnswerEntry {
            question_id: question_id.clone(),
            option_index: *option_index,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ExamQuestionView {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: Option<i32>,
    pub explanation: Option<String>,
}

impl ExamQuestionView {
    fn new(question: &ExamQuestion, reveal: bool) -> Self {
        ExamQuestionView {
            id: question.id.clone(),
            question: question.question.clone(),
            options: question.options.as_slice().to_vec(),
            correct_answer: reveal.then_some(question.correct_answer),
            explanation: if reveal { question.explanation.clone() } else { None },
        }
    }
}

/// Exam schedule as seen by its learner. The answer key is withheld until
/// the exam is COMPLETED.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ExamResponse {
    pub id: String,
    pub course_id: String,
    pub status: ExamStatus,
    pub question_count: i32,
    pub duration_minutes: i64,
    pub passing_score: i16,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub time_left_seconds: Option<i64>,
    pub questions: Vec<ExamQuestionView>,
    pub answers: Vec<AnswerEntry>,
    pub score: Option<i16>,
    pub correct_count: Option<i32>,
    pub total_questions: Option<i32>,
    pub passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<SubmissionSource>,
}

impl ExamResponse {
    pub fn at(exam: &ExamSchedule, now: DateTime<Utc>) -> Self {
        let reveal = exam.status == ExamStatus::Completed;
        let time_left_seconds = match exam.status {
            ExamStatus::InProgress => exam
                .deadline()
                .map(|deadline| exam_clock::time_left_seconds(deadline, now)),
            _ => None,
        };

        ExamResponse {
            id: exam.id.clone(),
            course_id: exam.course_id.clone(),
            status: exam.status,
            question_count: exam.question_count,
            duration_minutes: exam.duration_minutes,
            passing_score: exam.passing_score,
            scheduled_at: exam.scheduled_at,
            started_at: exam.started_at,
            deadline_at: exam.deadline(),
            time_left_seconds,
            questions: exam
                .questions
                .iter()
                .map(|q| ExamQuestionView::new(q, reveal))
                .collect(),
            answers: answer_entries(&exam.answers),
            score: exam.score,
            correct_count: exam.correct_count,
            total_questions: exam.total_questions,
            passed: exam.passed,
            completed_at: exam.completed_at,
            submitted_by: exam.submitted_by,
        }
    }
}

impl From<&ExamSchedule> for ExamResponse {
    fn from(exam: &ExamSchedule) -> Self {
        ExamResponse::at(exam, Utc::now())
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ExamTickResponse {
    pub exam_id: String,
    pub status: ExamStatus,
    pub time_left_seconds: i64,
    pub deadline_at: Option<DateTime<Utc>>,
    /// True when this tick was the call that closed the exam.
    pub auto_submitted: bool,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CertificateDto {
    pub id: String,
    pub certificate_number: String,
    pub user_id: String,
    pub course_id: String,
    pub exam_id: String,
    pub level: CertificateLevel,
    pub exam_score: i16,
    pub issue_date: DateTime<Utc>,
    pub blockchain_hash: Option<String>,
}

impl From<Certificate> for CertificateDto {
    fn from(certificate: Certificate) -> Self {
        CertificateDto {
            id: certificate.id,
            certificate_number: certificate.certificate_number,
            user_id: certificate.user_id,
            course_id: certificate.course_id,
            exam_id: certificate.exam_id,
            level: certificate.level,
            exam_score: certificate.exam_score,
            issue_date: certificate.issue_date,
            blockchain_hash: certificate.blockchain_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SubmitExamResponse {
    pub score: i16,
    pub passed: bool,
    pub correct_count: i32,
    pub total_questions: i32,
    pub exam: ExamResponse,
    pub certificate: Option<CertificateDto>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct VerifyCertificateResponse {
    pub certificate: CertificateDto,
    pub integrity_verified: bool,
}

impl From<Certificate> for VerifyCertificateResponse {
    fn from(certificate: Certificate) -> Self {
        VerifyCertificateResponse {
            integrity_verified: certificate.is_untampered(),
            certificate: certificate.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExamSettings;
    use crate::models::domain::{ExamCompletion, QuizOptions};

    fn quiz() -> Quiz {
        let question = QuizQuestion {
            id: "q1".to_string(),
            question: "Pick one".to_string(),
            options: QuizOptions::new(vec!["a".into(), "b".into()]),
            correct_answer: 1,
            explanation: Some("b is right".to_string()),
            order: 1,
        };
        Quiz::new("c-1", "t-1", 50, vec![question])
    }

    #[test]
    fn test_taking_view_hides_answer_key() {
        let view = QuizForTaking::taking(&quiz());

        assert_eq!(view.mode, QuizMode::Taking);
        assert_eq!(view.questions[0].correct_answer, None);
        assert_eq!(view.questions[0].explanation, None);
        assert!(!view.data_integrity_warning);
    }

    #[test]
    fn test_review_view_shows_answer_key() {
        let view = QuizForTaking::review(&quiz(), None);

        assert_eq!(view.questions[0].correct_answer, Some(1));
        assert_eq!(view.questions[0].explanation.as_deref(), Some("b is right"));
    }

    #[test]
    fn test_result_from_attempt_rebuilds_feedback() {
        let quiz = quiz();
        let answers: Answers = [("q1".to_string(), 1)].into_iter().collect();
        let card = ScoreCard::from_counts(1, 1, 50);
        let attempt = QuizAttempt::new("u-1", "e-1", &quiz.id, "t-1", answers, &card);

        let result = QuizResultResponse::from_attempt(&quiz, &attempt);

        assert!(result.recorded);
        assert_eq!(result.score, 100);
        assert!(result.feedback[0].is_correct);
        assert_eq!(result.completed_at, Some(attempt.completed_at));
    }

    #[test]
    fn test_exam_view_withholds_key_until_completed() {
        let mut exam = ExamSchedule::new("u-1", "c-1", "e-1", &ExamSettings::default());
        exam.questions = vec![ExamQuestion::new("c-1", "2 + 2?", vec!["3".into(), "4".into()], 1)];
        exam.status = ExamStatus::InProgress;
        exam.started_at = Some(Utc::now());

        let view = ExamResponse::from(&exam);
        assert_eq!(view.questions[0].correct_answer, None);
        assert!(view.time_left_seconds.unwrap_or(0) > 3500);

        ExamCompletion {
            answers: Answers::new(),
            card: ScoreCard::from_counts(0, 1, 60),
            completed_at: Utc::now(),
            submitted_by: SubmissionSource::Deadline,
        }
        .apply_to(&mut exam);

        let view = ExamResponse::from(&exam);
        assert_eq!(view.questions[0].correct_answer, Some(1));
        assert_eq!(view.time_left_seconds, None);
        assert_eq!(view.submitted_by, Some(SubmissionSource::Deadline));
    }
}
