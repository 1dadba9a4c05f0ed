use std::collections::HashMap;

use async_graphql::Enum;
use serde::{Deserialize, Serialize};

use crate::engine::scoring::percentage;
use crate::models::domain::{Topic, TopicProgress};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Locked,
    Available,
    Completed,
}

/// Stable order: sequence number, then creation time, then id.
pub fn order_topics(topics: &mut [Topic]) {
    topics.sort_by(|a, b| {
        a.sequence
            .cmp(&b.sequence)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Status of each position given completion flags in course order.
pub fn statuses(completed: &[bool]) -> Vec<TopicStatus> {
    completed
        .iter()
        .enumerate()
        .map(|(i, &done)| {
            if done {
                TopicStatus::Completed
            } else if i == 0 || completed[i - 1] {
                TopicStatus::Available
            } else {
                TopicStatus::Locked
            }
        })
        .collect()
}

/// Vacuously true for an empty course; callers treat that as misconfiguration.
pub fn exam_eligible(completed: &[bool]) -> bool {
    completed.iter().all(|&done| done)
}

/// Snapshot of one enrollment's progress evaluated against an ordered course.
#[derive(Clone, Debug)]
pub struct CourseSnapshot<'a> {
    topics: &'a [Topic],
    progress: &'a HashMap<String, TopicProgress>,
    completed: Vec<bool>,
}

impl<'a> CourseSnapshot<'a> {
    /// `topics` must already be in course order (see [`order_topics`]).
    pub fn new(topics: &'a [Topic], progress: &'a HashMap<String, TopicProgress>) -> Self {
        let completed = topics
            .iter()
            .map(|t| progress.get(&t.id).map(|p| p.is_completed).unwrap_or(false))
            .collect();

        Self {
            topics,
            progress,
            completed,
        }
    }

    pub fn statuses(&self) -> Vec<TopicStatus> {
        statuses(&self.completed)
    }

    pub fn status_of(&self, topic_id: &str) -> Option<TopicStatus> {
        let index = self.topics.iter().position(|t| t.id == topic_id)?;
        self.statuses().get(index).copied()
    }

    pub fn progress_of(&self, topic_id: &str) -> Option<&'a TopicProgress> {
        self.progress.get(topic_id)
    }

    pub fn exam_eligible(&self) -> bool {
        exam_eligible(&self.completed)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.iter().filter(|&&done| done).count()
    }

    pub fn percentage(&self) -> i16 {
        percentage(self.completed_count() as i32, self.topics.len() as i32)
    }

    pub fn topics(&self) -> &'a [Topic] {
        self.topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use TopicStatus::*;

    fn topic(id: &str, sequence: i32) -> Topic {
        let mut topic = Topic::new("course-1", id, sequence);
        topic.id = id.to_string();
        topic
    }

    fn completed(enrollment: &str, topic_id: &str) -> TopicProgress {
        let mut progress = TopicProgress::new(enrollment, topic_id);
        progress.mark_completed();
        progress
    }

    #[test]
    fn test_first_topic_is_available_on_fresh_enrollment() {
        assert_eq!(statuses(&[false, false, false]), vec![Available, Locked, Locked]);
    }

    #[test]
    fn test_completing_a_topic_unlocks_the_next() {
        assert_eq!(statuses(&[true, false, false]), vec![Completed, Available, Locked]);
        assert_eq!(statuses(&[true, true, true]), vec![Completed, Completed, Completed]);
    }

    #[test]
    fn test_available_only_after_completed_predecessor() {
        // every prefix of every completion pattern of length 5
        for mask in 0u32..32 {
            let flags: Vec<bool> = (0..5).map(|i| mask & (1 << i) != 0).collect();
            let result = statuses(&flags);
            for i in 0..flags.len() {
                if result[i] == Available {
                    assert!(i == 0 || result[i - 1] == Completed, "mask {:05b}", mask);
                }
                if flags[i] {
                    assert_eq!(result[i], Completed);
                }
            }
        }
    }

    #[test]
    fn test_exam_eligibility_requires_every_topic() {
        assert!(!exam_eligible(&[true, false]));
        assert!(exam_eligible(&[true, true]));
        assert!(exam_eligible(&[]));
    }

    #[test]
    fn test_order_topics_breaks_ties_by_creation_time() {
        let now = Utc::now();
        let mut early = topic("early", 1);
        early.created_at = now - Duration::seconds(10);
        let mut late = topic("late", 1);
        late.created_at = now;
        let first = topic("first", 0);

        let mut topics = vec![late.clone(), early.clone(), first.clone()];
        order_topics(&mut topics);

        let ids: Vec<&str> = topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "early", "late"]);
    }

    #[test]
    fn test_snapshot_reports_status_percentage_and_eligibility() {
        let topics = vec![topic("t1", 1), topic("t2", 2), topic("t3", 3), topic("t4", 4)];
        let mut progress = HashMap::new();
        progress.insert("t1".to_string(), completed("e", "t1"));
        let mut watched = TopicProgress::new("e", "t2");
        watched.record_video(true, 100);
        progress.insert("t2".to_string(), watched);

        let snapshot = CourseSnapshot::new(&topics, &progress);

        assert_eq!(snapshot.status_of("t1"), Some(Completed));
        assert_eq!(snapshot.status_of("t2"), Some(Available));
        assert_eq!(snapshot.status_of("t3"), Some(Locked));
        assert_eq!(snapshot.status_of("missing"), None);
        assert_eq!(snapshot.percentage(), 25);
        assert!(!snapshot.exam_eligible());
        assert!(snapshot.progress_of("t2").map(|p| p.video_watched).unwrap_or(false));
    }

    #[test]
    fn test_snapshot_all_completed_is_eligible() {
        let topics = vec![topic("t1", 1), topic("t2", 2)];
        let progress: HashMap<String, TopicProgress> = topics
            .iter()
            .map(|t| (t.id.clone(), completed("e", &t.id)))
            .collect();

        let snapshot = CourseSnapshot::new(&topics, &progress);

        assert!(snapshot.exam_eligible());
        assert_eq!(snapshot.percentage(), 100);
    }
}
