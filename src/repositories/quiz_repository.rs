use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Quiz};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn find_by_topic(&self, topic_id: &str) -> AppResult<Option<Quiz>>;
    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>>;
    /// Stores the quiz as the single quiz of its topic, replacing any previous one.
    async fn save(&self, quiz: &Quiz) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quizzes");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let topic_index = IndexModel::builder()
            .keys(doc! { "topic_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("topic_unique".to_string())
                    .build(),
            )
            .build();

        let course_index = IndexModel::builder()
            .keys(doc! { "course_id": 1 })
            .options(IndexOptions::builder().name("course_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(topic_index).await?;
        self.collection.create_index(course_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn find_by_topic(&self, topic_id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "topic_id": topic_id }).await?;
        Ok(quiz)
    }

    async fn list_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! { "course_id": course_id })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn save(&self, quiz: &Quiz) -> AppResult<()> {
        self.collection
            .replace_one(doc! { "topic_id": &quiz.topic_id }, quiz)
            .upsert(true)
            .await?;
        Ok(())
    }
}
