use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::{
    config::ExamSettings,
    engine::{
        exam_clock,
        scoring::{self, Answers},
    },
    errors::{AppError, AppResult},
    models::{
        domain::{Certificate, ExamCompletion, ExamQuestion, ExamSchedule, ExamStatus, SubmissionSource},
        dto::response::{ExamResponse, ExamTickResponse, SubmitExamResponse},
    },
    repositories::{ExamQuestionRepository, ExamScheduleRepository},
    services::{
        certificate_service::CertificateService, deadline_scheduler::DeadlineScheduler,
        progress_service::ProgressService,
    },
};

/// Final exam lifecycle: schedule, start, autosave, submit.
///
/// Every way out of IN_PROGRESS (learner submit, deadline timer, tick, sweeper)
/// goes through `complete_exam`, whose store write only succeeds while the row
/// is still IN_PROGRESS. The loser of a race sees `InvalidState`.
pub struct ExamService {
    schedules: Arc<dyn ExamScheduleRepository>,
    bank: Arc<dyn ExamQuestionRepository>,
    progress: Arc<ProgressService>,
    certificates: Arc<CertificateService>,
    settings: ExamSettings,
    scheduler: DeadlineScheduler,
}

impl ExamService {
    pub fn new(
        schedules: Arc<dyn ExamScheduleRepository>,
        bank: Arc<dyn ExamQuestionRepository>,
        progress: Arc<ProgressService>,
        certificates: Arc<CertificateService>,
        settings: ExamSettings,
    ) -> Self {
        Self {
            schedules,
            bank,
            progress,
            certificates,
            settings,
            scheduler: DeadlineScheduler::new(),
        }
    }

    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &DeadlineScheduler {
        &self.scheduler
    }

    pub async fn schedule(&self, user_id: &str, course_id: &str) -> AppResult<ExamSchedule> {
        let context = self.progress.course_context(user_id, course_id).await?;
        if !context.exam_eligibility()? {
            return Err(AppError::Locked(
                "Complete every topic of the course before scheduling the exam".to_string(),
            ));
        }

        if self.schedules.has_passed(user_id, course_id).await? {
            return Err(AppError::InvalidState(format!(
                "The exam for course '{}' has already been passed",
                course_id
            )));
        }

        if let Some(current) = self.schedules.find_current(user_id, course_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "Exam '{}' is already {}",
                current.id, current.status
            )));
        }

        let exam = ExamSchedule::new(
            user_id,
            course_id,
            &context.enrollment.id,
            &self.settings,
        );
        let exam = self.schedules.create(exam).await?;

        log::info!(
            "Scheduled exam {} for user {} in course {}",
            exam.id,
            user_id,
            course_id
        );
        Ok(exam)
    }

    /// Snapshots a random question set, starts the clock and arms the
    /// deadline timer.
    pub async fn start(self: &Arc<Self>, user_id: &str, exam_id: &str) -> AppResult<ExamSchedule> {
        let exam = self.find_owned(user_id, exam_id).await?;
        if exam.status != ExamStatus::Scheduled {
            return Err(AppError::InvalidState(format!(
                "Exam '{}' is {} and cannot be started",
                exam.id, exam.status
            )));
        }

        let bank = self.bank.list_by_course(&exam.course_id).await?;
        if bank.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Course '{}' has no exam questions",
                exam.course_id
            )));
        }
        let questions = sample_questions(bank, exam.question_count);

        let started_at = Utc::now();
        let deadline_at = exam_clock::deadline(started_at, exam.duration_minutes);
        let started = self
            .schedules
            .mark_in_progress(&exam.id, started_at, deadline_at, questions)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(format!("Exam '{}' has already been started", exam.id))
            })?;

        self.scheduler.arm(&started.id, deadline_at, Arc::clone(self));

        log::info!(
            "Started exam {} with {} questions, deadline {}",
            started.id,
            started.questions.len(),
            deadline_at
        );
        Ok(started)
    }

    /// Autosave; the deadline path scores whatever was saved last.
    pub async fn save_answers(&self, user_id: &str, exam_id: &str, answers: Answers) -> AppResult<ExamSchedule> {
        let exam = self.find_owned(user_id, exam_id).await?;
        self.ensure_in_progress(&exam)?;

        if exam.is_overdue(Utc::now()) {
            self.auto_submit(&exam.id).await?;
            return Err(AppError::InvalidState(format!(
                "Time is up for exam '{}'",
                exam.id
            )));
        }

        scoring::validate_answers(&exam.questions, &answers)?;
        self.schedules
            .save_answers(&exam.id, &answers)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(format!("Exam '{}' is no longer in progress", exam.id))
            })
    }

    pub async fn tick(&self, user_id: &str, exam_id: &str) -> AppResult<ExamTickResponse> {
        let mut exam = self.find_owned(user_id, exam_id).await?;
        let mut auto_submitted = false;

        if exam.is_overdue(Utc::now()) {
            match self.auto_submit(&exam.id).await? {
                Some(completed) => {
                    auto_submitted = true;
                    exam = completed;
                }
                None => exam = self.find_owned(user_id, exam_id).await?,
            }
        }

        Ok(tick_response(&exam, Utc::now(), auto_submitted))
    }

    pub async fn submit(&self, user_id: &str, exam_id: &str, answers: Answers) -> AppResult<SubmitExamResponse> {
        let exam = self.find_owned(user_id, exam_id).await?;
        self.ensure_in_progress(&exam)?;

        // past the deadline only the autosaved answers count; the payload is ignored
        if exam.is_overdue(Utc::now()) {
            let completed = self
                .complete_exam(&exam, exam.answers.clone(), SubmissionSource::Deadline)
                .await?;
            let certificate = self.certificate_for(&completed).await;
            return Ok(submit_response(&completed, certificate));
        }

        scoring::validate_answers(&exam.questions, &answers)?;
        let mut merged = exam.answers.clone();
        merged.extend(answers);

        let completed = self
            .complete_exam(&exam, merged, SubmissionSource::Learner)
            .await?;
        let certificate = self.certificate_for(&completed).await;

        Ok(submit_response(&completed, certificate))
    }

    /// Deadline-initiated submit. `Ok(None)` when the exam was no longer in
    /// progress, i.e. another path already completed it.
    pub async fn auto_submit(&self, exam_id: &str) -> AppResult<Option<ExamSchedule>> {
        let exam = self
            .schedules
            .find_by_id(exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", exam_id)))?;

        if exam.status != ExamStatus::InProgress {
            return Ok(None);
        }

        let answers = exam.answers.clone();
        match self
            .complete_exam(&exam, answers, SubmissionSource::Deadline)
            .await
        {
            Ok(completed) => {
                self.certificate_for(&completed).await;
                Ok(Some(completed))
            }
            Err(AppError::InvalidState(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn current(&self, user_id: &str, course_id: &str) -> AppResult<Option<ExamSchedule>> {
        let current = self.schedules.find_current(user_id, course_id).await?;
        match current {
            Some(exam) if exam.is_overdue(Utc::now()) => {
                self.auto_submit(&exam.id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub async fn history(&self, user_id: &str, course_id: &str) -> AppResult<Vec<ExamSchedule>> {
        self.schedules.list_completed(user_id, course_id).await
    }

    /// Auto-submits every overdue IN_PROGRESS exam. Returns how many this
    /// call completed.
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let now = Utc::now();
        let overdue: Vec<ExamSchedule> = self
            .schedules
            .list_in_progress()
            .await?
            .into_iter()
            .filter(|exam| exam.is_overdue(now))
            .collect();

        let mut completed = 0;
        for exam in overdue {
            match self.auto_submit(&exam.id).await {
                Ok(Some(_)) => completed += 1,
                Ok(None) => {}
                Err(e) => log::error!("Failed to auto-submit overdue exam {}: {}", exam.id, e),
            }
        }
        Ok(completed)
    }

    /// Re-arms timers for exams still running, e.g. after a restart.
    pub async fn restore_timers(self: &Arc<Self>) -> AppResult<usize> {
        let now = Utc::now();
        let mut armed = 0;
        for exam in self.schedules.list_in_progress().await? {
            if let Some(deadline) = exam.deadline() {
                if !exam_clock::is_expired(deadline, now) {
                    self.scheduler.arm(&exam.id, deadline, Arc::clone(self));
                    armed += 1;
                }
            }
        }
        Ok(armed)
    }

    async fn complete_exam(
        &self,
        exam: &ExamSchedule,
        answers: Answers,
        source: SubmissionSource,
    ) -> AppResult<ExamSchedule> {
        let (card, _) = scoring::grade(&exam.questions, &answers, exam.passing_score);
        let completion = ExamCompletion {
            answers,
            card,
            completed_at: Utc::now(),
            submitted_by: source,
        };

        match self.schedules.complete(&exam.id, &completion).await? {
            Some(completed) => {
                self.scheduler.disarm(&exam.id);
                log::info!(
                    "Exam {} submitted by {:?}: score {}, passed {}",
                    exam.id,
                    source,
                    card.score,
                    card.passed
                );
                Ok(completed)
            }
            None => {
                log::warn!("Rejected duplicate submit for exam {} ({:?})", exam.id, source);
                Err(AppError::InvalidState(format!(
                    "Exam '{}' has already been submitted",
                    exam.id
                )))
            }
        }
    }

    /// Issues the certificate for a passed exam. A failure here does not undo
    /// the completion; `generateCertificate` retries it.
    async fn certificate_for(&self, exam: &ExamSchedule) -> Option<Certificate> {
        if !exam.has_passed() {
            return None;
        }
        match self.certificates.issue_for_exam(exam).await {
            Ok(certificate) => Some(certificate),
            Err(e) => {
                log::error!("Exam {} passed but certificate issue failed: {}", exam.id, e);
                None
            }
        }
    }

    async fn find_owned(&self, user_id: &str, exam_id: &str) -> AppResult<ExamSchedule> {
        let exam = self
            .schedules
            .find_by_id(exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", exam_id)))?;

        if exam.user_id != user_id {
            return Err(AppError::Forbidden("You can only access your own exams".to_string()));
        }
        Ok(exam)
    }

    fn ensure_in_progress(&self, exam: &ExamSchedule) -> AppResult<()> {
        match exam.status {
            ExamStatus::InProgress => Ok(()),
            ExamStatus::Scheduled => Err(AppError::InvalidState(format!(
                "Exam '{}' has not been started",
                exam.id
            ))),
            ExamStatus::Completed => Err(AppError::InvalidState(format!(
                "Exam '{}' has already been submitted",
                exam.id
            ))),
        }
    }
}

fn sample_questions(mut bank: Vec<ExamQuestion>, count: i32) -> Vec<ExamQuestion> {
    bank.shuffle(&mut rand::thread_rng());
    bank.truncate(count.max(0) as usize);
    bank
}

fn tick_response(exam: &ExamSchedule, now: DateTime<Utc>, auto_submitted: bool) -> ExamTickResponse {
    let time_left_seconds = match (exam.status, exam.deadline()) {
        (ExamStatus::InProgress, Some(deadline)) => exam_clock::time_left_seconds(deadline, now),
        (ExamStatus::Scheduled, _) => exam.duration_minutes * 60,
        _ => 0,
    };

    ExamTickResponse {
        exam_id: exam.id.clone(),
        status: exam.status,
        time_left_seconds,
        deadline_at: exam.deadline(),
        auto_submitted,
    }
}

fn submit_response(exam: &ExamSchedule, certificate: Option<Certificate>) -> SubmitExamResponse {
    SubmitExamResponse {
        score: exam.score.unwrap_or_default(),
        passed: exam.passed.unwrap_or(false),
        correct_count: exam.correct_count.unwrap_or_default(),
        total_questions: exam.total_questions.unwrap_or_default(),
        exam: ExamResponse::from(exam),
        certificate: certificate.map(Into::into),
    }
}
