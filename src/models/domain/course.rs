use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn new(title: &str, description: Option<&str>) -> Self {
        Course {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }
}

/// A unit of course content: one video followed by an optional quiz.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Topic {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub video_url: Option<String>,
    pub sequence: i32,
    pub created_at: DateTime<Utc>, // tie-breaker for equal sequence numbers
}

impl Topic {
    pub fn new(course_id: &str, title: &str, sequence: i32) -> Self {
        Topic {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            title: title.to_string(),
            video_url: None,
            sequence,
            created_at: Utc::now(),
        }
    }
}
