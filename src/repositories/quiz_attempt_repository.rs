use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::QuizAttempt};

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the learner already has an attempt
    /// for the topic.
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_user_and_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> AppResult<Option<QuizAttempt>>;
    async fn exists_for_topic(&self, topic_id: &str) -> AppResult<bool>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quiz_attempts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_topic_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "topic_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_topic_unique".to_string())
                    .build(),
            )
            .build();

        let topic_index = IndexModel::builder()
            .keys(doc! { "topic_id": 1 })
            .options(IndexOptions::builder().name("topic_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_topic_index).await?;
        self.collection.create_index(topic_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.collection.insert_one(&attempt).await?;
        Ok(attempt)
    }

    async fn find_by_user_and_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! { "user_id": user_id, "topic_id": topic_id })
            .await?;
        Ok(attempt)
    }

    async fn exists_for_topic(&self, topic_id: &str) -> AppResult<bool> {
        let attempt = self.collection.find_one(doc! { "topic_id": topic_id }).await?;
        Ok(attempt.is_some())
    }
}
