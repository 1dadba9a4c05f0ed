use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, to_bson},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{Enrollment, EnrollmentStatus},
};

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the learner is already enrolled.
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Enrollment>>;
    async fn find_by_user_and_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Enrollment>>;
    /// Raises the aggregate percentage, never lowers it. Reaching 100 marks
    /// the enrollment COMPLETED.
    async fn record_progress(&self, id: &str, percentage: i16) -> AppResult<Option<Enrollment>>;
}

pub struct MongoEnrollmentRepository {
    collection: Collection<Enrollment>,
}

impl MongoEnrollmentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("enrollments");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for enrollments collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_course_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_course_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_course_index).await?;

        log::info!("Successfully created indexes for enrollments collection");
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for MongoEnrollmentRepository {
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        self.collection.insert_one(&enrollment).await?;
        Ok(enrollment)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Enrollment>> {
        let enrollment = self.collection.find_one(doc! { "id": id }).await?;
        Ok(enrollment)
    }

    async fn find_by_user_and_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Enrollment>> {
        let enrollment = self
            .collection
            .find_one(doc! { "user_id": user_id, "course_id": course_id })
            .await?;
        Ok(enrollment)
    }

    async fn record_progress(&self, id: &str, percentage: i16) -> AppResult<Option<Enrollment>> {
        let mut set = doc! { "modified_at": to_bson(&Utc::now())? };
        if percentage >= 100 {
            set.insert("status", to_bson(&EnrollmentStatus::Completed)?);
        }

        let enrollment = self
            .collection
            .find_one_and_update(
                doc! { "id": id },
                doc! {
                    "$max": { "progress": i32::from(percentage) },
                    "$set": set,
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(enrollment)
    }
}
