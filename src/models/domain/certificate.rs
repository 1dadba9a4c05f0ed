use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::certification;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Proof of course completion. Created once per learner and course, never
/// updated; `certificate_number` is the public verification key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Certificate {
    pub id: String,
    pub certificate_number: String,
    pub user_id: String,
    pub course_id: String,
    pub exam_id: String,
    pub level: CertificateLevel,
    pub exam_score: i16,
    pub issue_date: DateTime<Utc>,
    pub blockchain_hash: Option<String>,
}

impl Certificate {
    pub fn issue(user_id: &str, course_id: &str, exam_id: &str, exam_score: i16) -> Self {
        let issue_date = Utc::now();
        let certificate_number = certification::certificate_number(issue_date, Uuid::new_v4());
        let blockchain_hash = certification::integrity_hash(
            &certificate_number,
            user_id,
            course_id,
            exam_score,
            issue_date,
        );

        Certificate {
            id: Uuid::new_v4().to_string(),
            certificate_number,
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            exam_id: exam_id.to_string(),
            level: certification::level_for_score(exam_score),
            exam_score,
            issue_date,
            blockchain_hash: Some(blockchain_hash),
        }
    }

    /// Recomputes the integrity hash from the stored fields.
    pub fn is_untampered(&self) -> bool {
        match &self.blockchain_hash {
            Some(hash) => {
                *hash
                    == certification::integrity_hash(
                        &self.certificate_number,
                        &self.user_id,
                        &self.course_id,
                        self.exam_score,
                        self.issue_date,
                    )
            }
            None => true,
        }
    }
}
