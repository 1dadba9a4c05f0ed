use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::ExamQuestion};

/// The per-course question bank exams are sampled from. Running exams keep
/// their own snapshot, so replacing the bank never affects them.
#[async_trait]
pub trait ExamQuestionRepository: Send + Sync {
    async fn replace_bank(&self, course_id: &str, questions: Vec<ExamQuestion>) -> AppResult<()>;
    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<ExamQuestion>>;
}

pub struct MongoExamQuestionRepository {
    collection: Collection<ExamQuestion>,
}

impl MongoExamQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("exam_questions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exam_questions collection");

        let course_index = IndexModel::builder()
            .keys(doc! { "course_id": 1 })
            .options(IndexOptions::builder().name("course_id".to_string()).build())
            .build();

        self.collection.create_index(course_index).await?;

        log::info!("Successfully created indexes for exam_questions collection");
        Ok(())
    }
}

#[async_trait]
impl ExamQuestionRepository for MongoExamQuestionRepository {
    async fn replace_bank(&self, course_id: &str, questions: Vec<ExamQuestion>) -> AppResult<()> {
        self.collection
            .delete_many(doc! { "course_id": course_id })
            .await?;
        if !questions.is_empty() {
            self.collection.insert_many(questions).await?;
        }
        Ok(())
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<ExamQuestion>> {
        let questions = self
            .collection
            .find(doc! { "course_id": course_id })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }
}
