use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Certificate};

/// Certificates are insert-only. At most one exists per learner and course.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Fails with `AlreadyExists` if the learner already holds a certificate
    /// for the course.
    async fn create(&self, certificate: Certificate) -> AppResult<Certificate>;
    async fn find_by_user_and_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Certificate>>;
    async fn find_by_number(&self, certificate_number: &str) -> AppResult<Option<Certificate>>;
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Certificate>>;
}

pub struct MongoCertificateRepository {
    collection: Collection<Certificate>,
}

impl MongoCertificateRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("certificates");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for certificates collection");

        let user_course_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_course_unique".to_string())
                    .build(),
            )
            .build();

        let number_index = IndexModel::builder()
            .keys(doc! { "certificate_number": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("certificate_number_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_course_index).await?;
        self.collection.create_index(number_index).await?;

        log::info!("Successfully created indexes for certificates collection");
        Ok(())
    }
}

#[async_trait]
impl CertificateRepository for MongoCertificateRepository {
    async fn create(&self, certificate: Certificate) -> AppResult<Certificate> {
        self.collection.insert_one(&certificate).await?;
        Ok(certificate)
    }

    async fn find_by_user_and_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Certificate>> {
        let certificate = self
            .collection
            .find_one(doc! { "user_id": user_id, "course_id": course_id })
            .await?;
        Ok(certificate)
    }

    async fn find_by_number(&self, certificate_number: &str) -> AppResult<Option<Certificate>> {
        let certificate = self
            .collection
            .find_one(doc! { "certificate_number": certificate_number })
            .await?;
        Ok(certificate)
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Certificate>> {
        let certificates = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "issue_date": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(certificates)
    }
}
