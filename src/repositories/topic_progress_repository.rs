use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::TopicProgress,
};

#[async_trait]
pub trait TopicProgressRepository: Send + Sync {
    async fn find(&self, enrollment_id: &str, topic_id: &str) -> AppResult<Option<TopicProgress>>;
    async fn list_by_enrollment(&self, enrollment_id: &str) -> AppResult<Vec<TopicProgress>>;
    /// Upserts the row, combining it with what is stored so that no flag or
    /// percentage ever decreases. Returns the stored result.
    async fn merge(&self, progress: &TopicProgress) -> AppResult<TopicProgress>;
}

pub struct MongoTopicProgressRepository {
    collection: Collection<TopicProgress>,
}

impl MongoTopicProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("topic_progress");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for topic_progress collection");

        let enrollment_topic_index = IndexModel::builder()
            .keys(doc! { "enrollment_id": 1, "topic_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("enrollment_topic_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(enrollment_topic_index).await?;

        log::info!("Successfully created indexes for topic_progress collection");
        Ok(())
    }
}

#[async_trait]
impl TopicProgressRepository for MongoTopicProgressRepository {
    async fn find(&self, enrollment_id: &str, topic_id: &str) -> AppResult<Option<TopicProgress>> {
        let progress = self
            .collection
            .find_one(doc! { "enrollment_id": enrollment_id, "topic_id": topic_id })
            .await?;
        Ok(progress)
    }

    async fn list_by_enrollment(&self, enrollment_id: &str) -> AppResult<Vec<TopicProgress>> {
        let rows = self
            .collection
            .find(doc! { "enrollment_id": enrollment_id })
            .await?
            .try_collect()
            .await?;
        Ok(rows)
    }

    async fn merge(&self, progress: &TopicProgress) -> AppResult<TopicProgress> {
        // $max on booleans keeps true over false
        let mut update = doc! {
            "$max": {
                "video_watched": progress.video_watched,
                "video_progress": i32::from(progress.video_progress),
                "is_completed": progress.is_completed,
            },
            "$set": { "modified_at": to_bson(&progress.modified_at)? },
        };
        if let Some(completed_at) = progress.completed_at {
            update.insert("$min", doc! { "completed_at": to_bson(&completed_at)? });
        }

        self.collection
            .find_one_and_update(
                doc! { "enrollment_id": &progress.enrollment_id, "topic_id": &progress.topic_id },
                update,
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError(format!(
                    "Progress upsert for topic '{}' returned no document",
                    progress.topic_id
                ))
            })
    }
}
