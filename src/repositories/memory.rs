//! In-memory repositories backing tests and `STORE_BACKEND=memory`.
//!
//! Each one enforces the same uniqueness and conditional-write rules as the
//! MongoDB indexes and filters, so services behave identically on both.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    engine::scoring::Answers,
    errors::{AppError, AppResult},
    models::domain::{
        Certificate, Course, Enrollment, ExamCompletion, ExamQuestion, ExamSchedule, ExamStatus,
        Quiz, QuizAttempt, Topic, TopicProgress,
    },
    repositories::{
        CertificateRepository, CourseRepository, EnrollmentRepository, ExamQuestionRepository,
        ExamScheduleRepository, QuizAttemptRepository, QuizRepository, TopicProgressRepository,
    },
};

type Table<T> = Arc<RwLock<HashMap<String, T>>>;

#[derive(Default)]
pub struct InMemoryCourseRepository {
    courses: Table<Course>,
    topics: Table<Topic>,
}

impl InMemoryCourseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn save_course(&self, course: &Course) -> AppResult<()> {
        self.courses
            .write()
            .await
            .insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn find_course(&self, id: &str) -> AppResult<Option<Course>> {
        Ok(self.courses.read().await.get(id).cloned())
    }

    async fn save_topic(&self, topic: &Topic) -> AppResult<()> {
        self.topics
            .write()
            .await
            .insert(topic.id.clone(), topic.clone());
        Ok(())
    }

    async fn find_topic(&self, id: &str) -> AppResult<Option<Topic>> {
        Ok(self.topics.read().await.get(id).cloned())
    }

    async fn list_topics(&self, course_id: &str) -> AppResult<Vec<Topic>> {
        let topics = self.topics.read().await;
        let mut items: Vec<Topic> = topics
            .values()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect();
        items.sort_by_key(|t| t.sequence);
        Ok(items)
    }
}

#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Table<Enrollment>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        let mut enrollments = self.enrollments.write().await;
        let duplicate = enrollments.values().any(|e| {
            e.id == enrollment.id
                || (e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
        });
        if duplicate {
            return Err(AppError::AlreadyExists(format!(
                "User '{}' is already enrolled in course '{}'",
                enrollment.user_id, enrollment.course_id
            )));
        }
        enrollments.insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Enrollment>> {
        Ok(self.enrollments.read().await.get(id).cloned())
    }

    async fn find_by_user_and_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .values()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn record_progress(&self, id: &str, percentage: i16) -> AppResult<Option<Enrollment>> {
        let mut enrollments = self.enrollments.write().await;
        Ok(enrollments.get_mut(id).map(|enrollment| {
            enrollment.apply_progress(percentage);
            enrollment.clone()
        }))
    }
}

#[derive(Default)]
pub struct InMemoryTopicProgressRepository {
    rows: Table<TopicProgress>,
}

impl InMemoryTopicProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(enrollment_id: &str, topic_id: &str) -> String {
        format!("{}/{}", enrollment_id, topic_id)
    }
}

#[async_trait]
impl TopicProgressRepository for InMemoryTopicProgressRepository {
    async fn find(&self, enrollment_id: &str, topic_id: &str) -> AppResult<Option<TopicProgress>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&Self::key(enrollment_id, topic_id)).cloned())
    }

    async fn list_by_enrollment(&self, enrollment_id: &str) -> AppResult<Vec<TopicProgress>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|p| p.enrollment_id == enrollment_id)
            .cloned()
            .collect())
    }

    async fn merge(&self, progress: &TopicProgress) -> AppResult<TopicProgress> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .entry(Self::key(&progress.enrollment_id, &progress.topic_id))
            .or_insert_with(|| TopicProgress::new(&progress.enrollment_id, &progress.topic_id));

        stored.record_video(progress.video_watched, progress.video_progress);
        if progress.is_completed {
            stored.mark_completed();
        }
        Ok(stored.clone())
    }
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Table<Quiz>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.values().find(|q| q.id == id).cloned())
    }

    async fn find_by_topic(&self, topic_id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(topic_id).cloned())
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn save(&self, quiz: &Quiz) -> AppResult<()> {
        // keyed by topic: one quiz per topic
        self.quizzes
            .write()
            .await
            .insert(quiz.topic_id.clone(), quiz.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Table<QuizAttempt>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user_id: &str, topic_id: &str) -> String {
        format!("{}/{}", user_id, topic_id)
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        let key = Self::key(&attempt.user_id, &attempt.topic_id);
        if attempts.contains_key(&key) {
            return Err(AppError::AlreadyExists(format!(
                "Quiz attempt for topic '{}' already exists",
                attempt.topic_id
            )));
        }
        attempts.insert(key, attempt.clone());
        Ok(attempt)
    }

    async fn find_by_user_and_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.get(&Self::key(user_id, topic_id)).cloned())
    }

    async fn exists_for_topic(&self, topic_id: &str) -> AppResult<bool> {
        let attempts = self.attempts.read().await;
        Ok(attempts.values().any(|a| a.topic_id == topic_id))
    }
}

#[derive(Default)]
pub struct InMemoryExamQuestionRepository {
    banks: Table<Vec<ExamQuestion>>,
}

impl InMemoryExamQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamQuestionRepository for InMemoryExamQuestionRepository {
    async fn replace_bank(&self, course_id: &str, questions: Vec<ExamQuestion>) -> AppResult<()> {
        self.banks
            .write()
            .await
            .insert(course_id.to_string(), questions);
        Ok(())
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<ExamQuestion>> {
        let banks = self.banks.read().await;
        Ok(banks.get(course_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryExamScheduleRepository {
    exams: Table<ExamSchedule>,
}

impl InMemoryExamScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `update` only when the row is in `expected` status; the write
    /// lock makes check and update one step.
    async fn transition<F>(&self, id: &str, expected: ExamStatus, update: F) -> Option<ExamSchedule>
    where
        F: FnOnce(&mut ExamSchedule),
    {
        let mut exams = self.exams.write().await;
        let exam = exams.get_mut(id).filter(|e| e.status == expected)?;
        update(exam);
        Some(exam.clone())
    }
}

#[async_trait]
impl ExamScheduleRepository for InMemoryExamScheduleRepository {
    async fn create(&self, exam: ExamSchedule) -> AppResult<ExamSchedule> {
        let mut exams = self.exams.write().await;
        let conflict = exams.values().any(|e| {
            e.id == exam.id
                || (e.active
                    && exam.active
                    && e.user_id == exam.user_id
                    && e.course_id == exam.course_id)
        });
        if conflict {
            return Err(AppError::AlreadyExists(format!(
                "An active exam already exists for course '{}'",
                exam.course_id
            )));
        }
        exams.insert(exam.id.clone(), exam.clone());
        Ok(exam)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamSchedule>> {
        Ok(self.exams.read().await.get(id).cloned())
    }

    async fn find_current(&self, user_id: &str, course_id: &str) -> AppResult<Option<ExamSchedule>> {
        let exams = self.exams.read().await;
        Ok(exams
            .values()
            .find(|e| e.active && e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn list_completed(&self, user_id: &str, course_id: &str) -> AppResult<Vec<ExamSchedule>> {
        let exams = self.exams.read().await;
        let mut items: Vec<ExamSchedule> = exams
            .values()
            .filter(|e| {
                e.status == ExamStatus::Completed && e.user_id == user_id && e.course_id == course_id
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(items)
    }

    async fn has_passed(&self, user_id: &str, course_id: &str) -> AppResult<bool> {
        let exams = self.exams.read().await;
        Ok(exams
            .values()
            .any(|e| e.user_id == user_id && e.course_id == course_id && e.has_passed()))
    }

    async fn list_in_progress(&self) -> AppResult<Vec<ExamSchedule>> {
        let exams = self.exams.read().await;
        Ok(exams
            .values()
            .filter(|e| e.status == ExamStatus::InProgress)
            .cloned()
            .collect())
    }

    async fn mark_in_progress(
        &self,
        id: &str,
        started_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
        questions: Vec<ExamQuestion>,
    ) -> AppResult<Option<ExamSchedule>> {
        Ok(self
            .transition(id, ExamStatus::Scheduled, |exam| {
                exam.status = ExamStatus::InProgress;
                exam.started_at = Some(started_at);
                exam.deadline_at = Some(deadline_at);
                exam.questions = questions;
            })
            .await)
    }

    async fn save_answers(&self, id: &str, answers: &Answers) -> AppResult<Option<ExamSchedule>> {
        Ok(self
            .transition(id, ExamStatus::InProgress, |exam| {
                exam.answers
                    .extend(answers.iter().map(|(id, option)| (id.clone(), *option)));
            })
            .await)
    }

    async fn complete(&self, id: &str, completion: &ExamCompletion) -> AppResult<Option<ExamSchedule>> {
        Ok(self
            .transition(id, ExamStatus::InProgress, |exam| completion.apply_to(exam))
            .await)
    }
}

#[derive(Default)]
pub struct InMemoryCertificateRepository {
    certificates: Table<Certificate>,
}

impl InMemoryCertificateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CertificateRepository for InMemoryCertificateRepository {
    async fn create(&self, certificate: Certificate) -> AppResult<Certificate> {
        let mut certificates = self.certificates.write().await;
        let duplicate = certificates.values().any(|c| {
            c.certificate_number == certificate.certificate_number
                || (c.user_id == certificate.user_id && c.course_id == certificate.course_id)
        });
        if duplicate {
            return Err(AppError::AlreadyExists(format!(
                "Certificate for course '{}' already exists",
                certificate.course_id
            )));
        }
        certificates.insert(certificate.id.clone(), certificate.clone());
        Ok(certificate)
    }

    async fn find_by_user_and_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Certificate>> {
        let certificates = self.certificates.read().await;
        Ok(certificates
            .values()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned())
    }

    async fn find_by_number(&self, certificate_number: &str) -> AppResult<Option<Certificate>> {
        let certificates = self.certificates.read().await;
        Ok(certificates
            .values()
            .find(|c| c.certificate_number == certificate_number)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Certificate>> {
        let certificates = self.certificates.read().await;
        let mut items: Vec<Certificate> = certificates
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        Ok(items)
    }
}
