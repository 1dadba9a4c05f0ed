use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub progress: i16, // aggregate percentage, recomputed from topic progress
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(user_id: &str, course_id: &str) -> Self {
        Enrollment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            status: EnrollmentStatus::Active,
            progress: 0,
            enrolled_at: Utc::now(),
            modified_at: Some(Utc::now()),
        }
    }

    /// Applies a recomputed aggregate. Progress never moves backwards.
    pub fn apply_progress(&mut self, percentage: i16) {
        self.progress = self.progress.max(percentage.clamp(0, 100));
        if self.progress >= 100 {
            self.status = EnrollmentStatus::Completed;
        }
        self.modified_at = Some(Utc::now());
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
