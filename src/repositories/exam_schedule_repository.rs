use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    engine::scoring::Answers,
    errors::AppResult,
    models::domain::{ExamCompletion, ExamQuestion, ExamSchedule, ExamStatus},
};

/// Exam schedule storage. The `mark_in_progress`, `save_answers` and
/// `complete` writes are conditional on the current status and return `None`
/// when the row was not in the expected state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamScheduleRepository: Send + Sync {
    /// Fails with `AlreadyExists` while another active schedule exists for
    /// the same learner and course.
    async fn create(&self, exam: ExamSchedule) -> AppResult<ExamSchedule>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamSchedule>>;
    /// The SCHEDULED or IN_PROGRESS row, if any. COMPLETED rows are history.
    async fn find_current(&self, user_id: &str, course_id: &str) -> AppResult<Option<ExamSchedule>>;
    async fn list_completed(&self, user_id: &str, course_id: &str) -> AppResult<Vec<ExamSchedule>>;
    async fn has_passed(&self, user_id: &str, course_id: &str) -> AppResult<bool>;
    async fn list_in_progress(&self) -> AppResult<Vec<ExamSchedule>>;
    async fn mark_in_progress(
        &self,
        id: &str,
        started_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
        questions: Vec<ExamQuestion>,
    ) -> AppResult<Option<ExamSchedule>>;
    async fn save_answers(&self, id: &str, answers: &Answers) -> AppResult<Option<ExamSchedule>>;
    async fn complete(&self, id: &str, completion: &ExamCompletion) -> AppResult<Option<ExamSchedule>>;
}

pub struct MongoExamScheduleRepository {
    collection: Collection<ExamSchedule>,
}

impl MongoExamScheduleRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("exam_schedules");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exam_schedules collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let active_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "active": true })
                    .name("user_course_active_unique".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().name("status".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(active_index).await?;
        self.collection.create_index(status_index).await?;

        log::info!("Successfully created indexes for exam_schedules collection");
        Ok(())
    }
}

#[async_trait]
impl ExamScheduleRepository for MongoExamScheduleRepository {
    async fn create(&self, exam: ExamSchedule) -> AppResult<ExamSchedule> {
        self.collection.insert_one(&exam).await?;
        Ok(exam)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamSchedule>> {
        let exam = self.collection.find_one(doc! { "id": id }).await?;
        Ok(exam)
    }

    async fn find_current(&self, user_id: &str, course_id: &str) -> AppResult<Option<ExamSchedule>> {
        let exam = self
            .collection
            .find_one(doc! { "user_id": user_id, "course_id": course_id, "active": true })
            .await?;
        Ok(exam)
    }

    async fn list_completed(&self, user_id: &str, course_id: &str) -> AppResult<Vec<ExamSchedule>> {
        let exams = self
            .collection
            .find(doc! {
                "user_id": user_id,
                "course_id": course_id,
                "status": ExamStatus::Completed.as_str(),
            })
            .sort(doc! { "completed_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(exams)
    }

    async fn has_passed(&self, user_id: &str, course_id: &str) -> AppResult<bool> {
        let exam = self
            .collection
            .find_one(doc! {
                "user_id": user_id,
                "course_id": course_id,
                "status": ExamStatus::Completed.as_str(),
                "passed": true,
            })
            .await?;
        Ok(exam.is_some())
    }

    async fn list_in_progress(&self) -> AppResult<Vec<ExamSchedule>> {
        let exams = self
            .collection
            .find(doc! { "status": ExamStatus::InProgress.as_str() })
            .await?
            .try_collect()
            .await?;
        Ok(exams)
    }

    async fn mark_in_progress(
        &self,
        id: &str,
        started_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
        questions: Vec<ExamQuestion>,
    ) -> AppResult<Option<ExamSchedule>> {
        let exam = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "status": ExamStatus::Scheduled.as_str() },
                doc! {
                    "$set": {
                        "status": ExamStatus::InProgress.as_str(),
                        "started_at": to_bson(&started_at)?,
                        "deadline_at": to_bson(&deadline_at)?,
                        "questions": to_bson(&questions)?,
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(exam)
    }

    async fn save_answers(&self, id: &str, answers: &Answers) -> AppResult<Option<ExamSchedule>> {
        let filter = doc! { "id": id, "status": ExamStatus::InProgress.as_str() };
        if answers.is_empty() {
            return Ok(self.collection.find_one(filter).await?);
        }

        // one key per answer so earlier autosaves are kept
        let mut merged = Document::new();
        for (question_id, option_index) in answers {
            merged.insert(format!("answers.{}", question_id), *option_index);
        }

        let exam = self
            .collection
            .find_one_and_update(filter, doc! { "$set": merged })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(exam)
    }

    async fn complete(&self, id: &str, completion: &ExamCompletion) -> AppResult<Option<ExamSchedule>> {
        let card = &completion.card;
        let exam = self
            .collection
            .find_one_and_update(
                doc! { "id": id, "status": ExamStatus::InProgress.as_str() },
                doc! {
                    "$set": {
                        "status": ExamStatus::Completed.as_str(),
                        "active": false,
                        "answers": to_bson(&completion.answers)?,
                        "score": i32::from(card.score),
                        "correct_count": card.correct_count,
                        "total_questions": card.total_questions,
                        "passed": card.passed,
                        "completed_at": to_bson(&completion.completed_at)?,
                        "submitted_by": to_bson(&completion.submitted_by)?,
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(exam)
    }
}
