use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use validator::Validate;

use crate::{
    engine::unlock_policy::{self, CourseSnapshot, TopicStatus},
    errors::{AppError, AppResult},
    models::{
        domain::{Course, Enrollment, Topic, TopicProgress},
        dto::{request::UpdateProgressRequest, response::CourseProgressResponse},
    },
    repositories::{CourseRepository, EnrollmentRepository, QuizRepository, TopicProgressRepository},
};

/// Everything the gating rules need about one learner in one course.
pub struct ProgressContext {
    pub course: Course,
    pub enrollment: Enrollment,
    /// In unlock order.
    pub topics: Vec<Topic>,
    pub progress: HashMap<String, TopicProgress>,
}

impl ProgressContext {
    pub fn snapshot(&self) -> CourseSnapshot<'_> {
        CourseSnapshot::new(&self.topics, &self.progress)
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    pub fn progress_of(&self, topic_id: &str) -> Option<&TopicProgress> {
        self.progress.get(topic_id)
    }

    /// Exam eligibility; an empty course is a content error, not eligibility.
    pub fn exam_eligibility(&self) -> AppResult<bool> {
        if self.topics.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Course '{}' has no topics",
                self.course.id
            )));
        }
        Ok(self.snapshot().exam_eligible())
    }
}

pub struct ProgressService {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn TopicProgressRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl ProgressService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn TopicProgressRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> Self {
        Self {
            courses,
            enrollments,
            progress,
            quizzes,
        }
    }

    /// Returns the learner's enrollment in the course, creating it on first call.
    pub async fn enroll(&self, user_id: &str, course_id: &str) -> AppResult<Enrollment> {
        self.find_course(course_id).await?;

        if let Some(existing) = self
            .enrollments
            .find_by_user_and_course(user_id, course_id)
            .await?
        {
            return Ok(existing);
        }

        match self.enrollments.create(Enrollment::new(user_id, course_id)).await {
            Ok(enrollment) => {
                log::info!("User {} enrolled in course {}", user_id, course_id);
                Ok(enrollment)
            }
            // lost a race with a concurrent enroll call
            Err(AppError::AlreadyExists(_)) => self
                .enrollments
                .find_by_user_and_course(user_id, course_id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError("Enrollment vanished after conflict".to_string())
                }),
            Err(e) => Err(e),
        }
    }

    pub async fn get_course_progress(
        &self,
        user_id: &str,
        enrollment_id: &str,
    ) -> AppResult<CourseProgressResponse> {
        let enrollment = self.owned_enrollment(user_id, enrollment_id).await?;
        let context = self.load_context(enrollment).await?;
        self.progress_response(&context).await
    }

    /// Folds a client progress report into the enrollment. Completion sent by
    /// the client is only accepted for quiz-less topics with a watched video;
    /// quiz topics complete through a passing quiz.
    pub async fn update_progress(
        &self,
        user_id: &str,
        enrollment_id: &str,
        topic_id: &str,
        request: UpdateProgressRequest,
    ) -> AppResult<CourseProgressResponse> {
        request.validate()?;
        let enrollment = self.owned_enrollment(user_id, enrollment_id).await?;
        let context = self.load_context(enrollment).await?;
        self.ensure_unlocked(&context, topic_id)?;

        let mut merged = context
            .progress_of(topic_id)
            .cloned()
            .unwrap_or_else(|| TopicProgress::new(enrollment_id, topic_id));
        merged.record_video(
            request.video_watched.unwrap_or(false),
            request.video_progress.unwrap_or(0),
        );

        if request.is_completed == Some(true) && !merged.is_completed {
            if self.quizzes.find_by_topic(topic_id).await?.is_some() {
                return Err(AppError::ValidationError(
                    "This topic is completed by passing its quiz".to_string(),
                ));
            }
            if !merged.video_watched {
                return Err(AppError::ValidationError(
                    "Watch the topic video before completing it".to_string(),
                ));
            }
            merged.mark_completed();
        }
        merged.modified_at = Some(Utc::now());

        let was_completed = context
            .progress_of(topic_id)
            .map(|p| p.is_completed)
            .unwrap_or(false);
        let stored = self.progress.merge(&merged).await?;
        if stored.is_completed && !was_completed {
            log::info!("Topic {} completed in enrollment {}", topic_id, enrollment_id);
        }

        let context = self.refresh(context).await?;
        self.progress_response(&context).await
    }

    /// Durably marks the topic completed, then recomputes the aggregate.
    /// Idempotent.
    pub async fn mark_topic_completed(&self, enrollment: &Enrollment, topic_id: &str) -> AppResult<Enrollment> {
        let mut progress = TopicProgress::new(&enrollment.id, topic_id);
        progress.mark_completed();
        self.progress.merge(&progress).await?;
        log::info!("Topic {} completed in enrollment {}", topic_id, enrollment.id);

        let context = self.load_context(enrollment.clone()).await?;
        let context = self.refresh(context).await?;
        Ok(context.enrollment)
    }

    /// Loads the learner's context for the course owning `topic_id` and checks
    /// the topic is not locked.
    pub async fn topic_context(&self, user_id: &str, topic_id: &str) -> AppResult<ProgressContext> {
        let topic = self
            .courses
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic with id '{}' not found", topic_id)))?;

        let enrollment = self.enrollment_for(user_id, &topic.course_id).await?;
        let context = self.load_context(enrollment).await?;
        self.ensure_unlocked(&context, topic_id)?;
        Ok(context)
    }

    /// Context for exam gating, keyed by learner and course.
    pub async fn course_context(&self, user_id: &str, course_id: &str) -> AppResult<ProgressContext> {
        let enrollment = self.enrollment_for(user_id, course_id).await?;
        self.load_context(enrollment).await
    }

    async fn enrollment_for(&self, user_id: &str, course_id: &str) -> AppResult<Enrollment> {
        self.enrollments
            .find_by_user_and_course(user_id, course_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No enrollment in course '{}' for this user", course_id))
            })
    }

    async fn owned_enrollment(&self, user_id: &str, enrollment_id: &str) -> AppResult<Enrollment> {
        let enrollment = self
            .enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Enrollment with id '{}' not found", enrollment_id))
            })?;

        if !enrollment.is_owned_by(user_id) {
            return Err(AppError::Forbidden(
                "You can only access your own enrollments".to_string(),
            ));
        }
        Ok(enrollment)
    }

    async fn find_course(&self, course_id: &str) -> AppResult<Course> {
        self.courses
            .find_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", course_id)))
    }

    async fn load_context(&self, enrollment: Enrollment) -> AppResult<ProgressContext> {
        let course = self.find_course(&enrollment.course_id).await?;
        let mut topics = self.courses.list_topics(&course.id).await?;
        unlock_policy::order_topics(&mut topics);

        let progress = self
            .progress
            .list_by_enrollment(&enrollment.id)
            .await?
            .into_iter()
            .map(|p| (p.topic_id.clone(), p))
            .collect();

        Ok(ProgressContext {
            course,
            enrollment,
            topics,
            progress,
        })
    }

    /// Re-reads topic progress and writes the recomputed aggregate.
    async fn refresh(&self, context: ProgressContext) -> AppResult<ProgressContext> {
        let mut context = self.load_context(context.enrollment).await?;
        let percentage = context.snapshot().percentage();

        context.enrollment = self
            .enrollments
            .record_progress(&context.enrollment.id, percentage)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Enrollment with id '{}' not found",
                    context.enrollment.id
                ))
            })?;
        Ok(context)
    }

    fn ensure_unlocked(&self, context: &ProgressContext, topic_id: &str) -> AppResult<()> {
        match context.snapshot().status_of(topic_id) {
            None => Err(AppError::NotFound(format!(
                "Topic '{}' is not part of course '{}'",
                topic_id, context.course.id
            ))),
            Some(TopicStatus::Locked) => Err(AppError::Locked(format!(
                "Topic '{}' is locked until the previous topic is completed",
                topic_id
            ))),
            Some(_) => Ok(()),
        }
    }

    async fn progress_response(&self, context: &ProgressContext) -> AppResult<CourseProgressResponse> {
        let quiz_topics: Vec<String> = self
            .quizzes
            .list_by_course(&context.course.id)
            .await?
            .into_iter()
            .map(|q| q.topic_id)
            .collect();

        Ok(CourseProgressResponse::build(
            &context.course,
            &context.enrollment,
            &context.snapshot(),
            &quiz_topics,
        ))
    }
}
