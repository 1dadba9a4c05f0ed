use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion state of one topic within one enrollment.
///
/// Every mutation is monotonic: a watched video stays watched, progress only
/// grows, and a completed topic never reverts. `is_completed` implies
/// `video_watched`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopicProgress {
    pub enrollment_id: String,
    pub topic_id: String,
    pub video_watched: bool,
    pub video_progress: i16,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl TopicProgress {
    pub fn new(enrollment_id: &str, topic_id: &str) -> Self {
        TopicProgress {
            enrollment_id: enrollment_id.to_string(),
            topic_id: topic_id.to_string(),
            video_watched: false,
            video_progress: 0,
            is_completed: false,
            completed_at: None,
            modified_at: Some(Utc::now()),
        }
    }

    /// Folds a video progress report into the record. Returns whether anything changed.
    pub fn record_video(&mut self, watched: bool, progress: i16) -> bool {
        let progress = progress.clamp(0, 100);
        let watched = self.video_watched || watched || progress >= 100;
        let progress = if watched { 100 } else { self.video_progress.max(progress) };

        let changed = watched != self.video_watched || progress != self.video_progress;
        self.video_watched = watched;
        self.video_progress = progress;
        if changed {
            self.modified_at = Some(Utc::now());
        }
        changed
    }

    pub fn mark_completed(&mut self) {
        if self.is_completed {
            return;
        }
        self.video_watched = true;
        self.video_progress = 100;
        self.is_completed = true;
        self.completed_at = Some(Utc::now());
        self.modified_at = self.completed_at;
    }
}
