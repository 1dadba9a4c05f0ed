use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{Course, Topic},
};

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn save_course(&self, course: &Course) -> AppResult<()>;
    async fn find_course(&self, id: &str) -> AppResult<Option<Course>>;
    async fn save_topic(&self, topic: &Topic) -> AppResult<()>;
    async fn find_topic(&self, id: &str) -> AppResult<Option<Topic>>;
    /// Topics of a course in storage order; callers apply the unlock ordering.
    async fn list_topics(&self, course_id: &str) -> AppResult<Vec<Topic>>;
}

pub struct MongoCourseRepository {
    courses: Collection<Course>,
    topics: Collection<Topic>,
}

impl MongoCourseRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            courses: db.get_collection("courses"),
            topics: db.get_collection("topics"),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for courses and topics collections");

        let course_id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let topic_id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let course_sequence_index = IndexModel::builder()
            .keys(doc! { "course_id": 1, "sequence": 1 })
            .options(
                IndexOptions::builder()
                    .name("course_sequence".to_string())
                    .build(),
            )
            .build();

        self.courses.create_index(course_id_index).await?;
        self.topics.create_index(topic_id_index).await?;
        self.topics.create_index(course_sequence_index).await?;

        log::info!("Successfully created indexes for courses and topics collections");
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn save_course(&self, course: &Course) -> AppResult<()> {
        self.courses
            .replace_one(doc! { "id": &course.id }, course)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find_course(&self, id: &str) -> AppResult<Option<Course>> {
        let course = self.courses.find_one(doc! { "id": id }).await?;
        Ok(course)
    }

    async fn save_topic(&self, topic: &Topic) -> AppResult<()> {
        self.topics
            .replace_one(doc! { "id": &topic.id }, topic)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find_topic(&self, id: &str) -> AppResult<Option<Topic>> {
        let topic = self.topics.find_one(doc! { "id": id }).await?;
        Ok(topic)
    }

    async fn list_topics(&self, course_id: &str) -> AppResult<Vec<Topic>> {
        let topics = self
            .topics
            .find(doc! { "course_id": course_id })
            .sort(doc! { "sequence": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(topics)
    }
}
