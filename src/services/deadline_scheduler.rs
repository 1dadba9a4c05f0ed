use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::task::{AbortHandle, JoinHandle};

use crate::{engine::exam_clock, services::exam_service::ExamService};

/// One pending auto-submit timer per running exam.
///
/// A timer is armed when an exam starts and disarmed by whichever submit path
/// completes it. A firing timer removes its own entry before submitting, so a
/// submit never aborts the task that is performing it.
#[derive(Clone, Default)]
pub struct DeadlineScheduler {
    timers: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, exam_id: &str, deadline: DateTime<Utc>, exams: Arc<ExamService>) {
        let delay = exam_clock::until(deadline, Utc::now());
        let Ok(mut timers) = self.timers.lock() else {
            log::error!("Deadline timer table is poisoned; exam {} relies on the sweeper", exam_id);
            return;
        };

        let id = exam_id.to_string();
        let table = self.timers.clone();
        // the lock is held until the entry is inserted, so the task's own
        // removal can never run first
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut timers) = table.lock() {
                timers.remove(&id);
            }

            match exams.auto_submit(&id).await {
                Ok(Some(_)) => log::info!("Deadline auto-submitted exam {}", id),
                Ok(None) => log::debug!("Deadline for exam {} fired after it was completed", id),
                Err(e) => log::error!("Deadline auto-submit failed for exam {}: {}", id, e),
            }
        });

        if let Some(previous) = timers.insert(exam_id.to_string(), task.abort_handle()) {
            previous.abort();
        }
        log::debug!("Armed deadline timer for exam {} in {:?}", exam_id, delay);
    }

    /// Cancels the pending timer of an exam, if any.
    pub fn disarm(&self, exam_id: &str) {
        if let Ok(mut timers) = self.timers.lock() {
            if let Some(handle) = timers.remove(exam_id) {
                handle.abort();
                log::debug!("Disarmed deadline timer for exam {}", exam_id);
            }
        }
    }

    pub fn is_armed(&self, exam_id: &str) -> bool {
        self.timers
            .lock()
            .map(|timers| timers.contains_key(exam_id))
            .unwrap_or(false)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.lock().map(|timers| timers.len()).unwrap_or(0)
    }
}

/// Periodically auto-submits IN_PROGRESS exams whose deadline passed while no
/// timer was watching them, e.g. across a restart.
pub fn spawn_sweeper(exams: Arc<ExamService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match exams.sweep_expired().await {
                Ok(0) => {}
                Ok(count) => log::info!("Sweeper auto-submitted {} overdue exams", count),
                Err(e) => log::error!("Exam sweep failed: {}", e),
            }
        }
    })
}
