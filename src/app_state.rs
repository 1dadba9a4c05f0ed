use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{
    auth::JwtService,
    config::{Config, StoreBackend},
    db::Database,
    errors::AppResult,
    repositories::{
        memory::{
            InMemoryCertificateRepository, InMemoryCourseRepository, InMemoryEnrollmentRepository,
            InMemoryExamQuestionRepository, InMemoryExamScheduleRepository, InMemoryQuizAttemptRepository,
            InMemoryQuizRepository, InMemoryTopicProgressRepository,
        },
        CertificateRepository, CourseRepository, EnrollmentRepository, ExamQuestionRepository,
        ExamScheduleRepository, MongoCertificateRepository, MongoCourseRepository,
        MongoEnrollmentRepository, MongoExamQuestionRepository, MongoExamScheduleRepository,
        MongoQuizAttemptRepository, MongoQuizRepository, MongoTopicProgressRepository,
        QuizAttemptRepository, QuizRepository, TopicProgressRepository,
    },
    services::{
        deadline_scheduler, CertificateService, ContentService, ExamService, ProgressService,
        QuizService,
    },
};

const TOKEN_EXPIRATION_HOURS: i64 = 24;

/// One handle per record type, backed by the same store.
struct Repositories {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    topic_progress: Arc<dyn TopicProgressRepository>,
    quizzes: Arc<dyn QuizRepository>,
    quiz_attempts: Arc<dyn QuizAttemptRepository>,
    exam_questions: Arc<dyn ExamQuestionRepository>,
    exam_schedules: Arc<dyn ExamScheduleRepository>,
    certificates: Arc<dyn CertificateRepository>,
}

impl Repositories {
    async fn mongo(db: &Database) -> AppResult<Self> {
        let courses = MongoCourseRepository::new(db);
        courses.ensure_indexes().await?;
        let enrollments = MongoEnrollmentRepository::new(db);
        enrollments.ensure_indexes().await?;
        let topic_progress = MongoTopicProgressRepository::new(db);
        topic_progress.ensure_indexes().await?;
        let quizzes = MongoQuizRepository::new(db);
        quizzes.ensure_indexes().await?;
        let quiz_attempts = MongoQuizAttemptRepository::new(db);
        quiz_attempts.ensure_indexes().await?;
        let exam_questions = MongoExamQuestionRepository::new(db);
        exam_questions.ensure_indexes().await?;
        let exam_schedules = MongoExamScheduleRepository::new(db);
        exam_schedules.ensure_indexes().await?;
        let certificates = MongoCertificateRepository::new(db);
        certificates.ensure_indexes().await?;

        Ok(Self {
            courses: Arc::new(courses),
            enrollments: Arc::new(enrollments),
            topic_progress: Arc::new(topic_progress),
            quizzes: Arc::new(quizzes),
            quiz_attempts: Arc::new(quiz_attempts),
            exam_questions: Arc::new(exam_questions),
            exam_schedules: Arc::new(exam_schedules),
            certificates: Arc::new(certificates),
        })
    }

    fn in_memory() -> Self {
        Self {
            courses: Arc::new(InMemoryCourseRepository::new()),
            enrollments: Arc::new(InMemoryEnrollmentRepository::new()),
            topic_progress: Arc::new(InMemoryTopicProgressRepository::new()),
            quizzes: Arc::new(InMemoryQuizRepository::new()),
            quiz_attempts: Arc::new(InMemoryQuizAttemptRepository::new()),
            exam_questions: Arc::new(InMemoryExamQuestionRepository::new()),
            exam_schedules: Arc::new(InMemoryExamScheduleRepository::new()),
            certificates: Arc::new(InMemoryCertificateRepository::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub progress_service: Arc<ProgressService>,
    pub quiz_service: Arc<QuizService>,
    pub exam_service: Arc<ExamService>,
    pub certificate_service: Arc<CertificateService>,
    pub content_service: Arc<ContentService>,
    pub jwt_service: Arc<JwtService>,
    /// `None` when running on the in-memory store.
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        match config.store_backend {
            StoreBackend::Mongo => {
                let db = Database::connect(&config).await?;
                let repositories = Repositories::mongo(&db).await?;
                Ok(Self::assemble(config, repositories, Some(db)))
            }
            StoreBackend::Memory => {
                log::warn!("Using the in-memory store; nothing will be persisted");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self::assemble(config, Repositories::in_memory(), None)
    }

    fn assemble(config: Config, repositories: Repositories, db: Option<Database>) -> Self {
        let progress_service = Arc::new(ProgressService::new(
            repositories.courses.clone(),
            repositories.enrollments,
            repositories.topic_progress,
            repositories.quizzes.clone(),
        ));
        let quiz_service = Arc::new(QuizService::new(
            repositories.quizzes.clone(),
            repositories.quiz_attempts.clone(),
            progress_service.clone(),
        ));
        let certificate_service = Arc::new(CertificateService::new(
            repositories.certificates,
            repositories.exam_schedules.clone(),
        ));
        let exam_service = Arc::new(ExamService::new(
            repositories.exam_schedules,
            repositories.exam_questions.clone(),
            progress_service.clone(),
            certificate_service.clone(),
            config.exam,
        ));
        let content_service = Arc::new(ContentService::new(
            repositories.courses,
            repositories.quizzes,
            repositories.quiz_attempts,
            repositories.exam_questions,
        ));
        let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, TOKEN_EXPIRATION_HOURS));

        Self {
            progress_service,
            quiz_service,
            exam_service,
            certificate_service,
            content_service,
            jwt_service,
            db,
            config: Arc::new(config),
        }
    }

    /// Re-arms deadline timers of running exams and starts the overdue sweeper.
    pub async fn start_background_tasks(&self) -> AppResult<JoinHandle<()>> {
        let armed = self.exam_service.restore_timers().await?;
        let swept = self.exam_service.sweep_expired().await?;
        log::info!(
            "Restored {} exam deadline timers, auto-submitted {} overdue exams",
            armed,
            swept
        );

        let every = Duration::from_secs(self.config.exam.sweep_interval_secs.max(1));
        Ok(deadline_scheduler::spawn_sweeper(self.exam_service.clone(), every))
    }

    pub fn store_name(&self) -> &'static str {
        match self.db {
            Some(_) => "mongodb",
            None => "memory",
        }
    }

    pub async fn health_check(&self) -> AppResult<()> {
        match &self.db {
            Some(db) => db.health_check().await,
            None => Ok(()),
        }
    }
}
