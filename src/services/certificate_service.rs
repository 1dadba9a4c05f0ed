use std::sync::Arc;

use crate::{
    engine::certification,
    errors::{AppError, AppResult},
    models::domain::{Certificate, ExamSchedule},
    repositories::{CertificateRepository, ExamScheduleRepository},
};

/// Inserts tried per issue; a number collision regenerates the number.
const ISSUE_ATTEMPTS: usize = 2;

pub struct CertificateService {
    certificates: Arc<dyn CertificateRepository>,
    schedules: Arc<dyn ExamScheduleRepository>,
}

impl CertificateService {
    pub fn new(
        certificates: Arc<dyn CertificateRepository>,
        schedules: Arc<dyn ExamScheduleRepository>,
    ) -> Self {
        Self {
            certificates,
            schedules,
        }
    }

    /// Idempotent: returns the learner's existing certificate for the course
    /// when there is one, otherwise issues it from this passed exam.
    pub async fn issue_for_exam(&self, exam: &ExamSchedule) -> AppResult<Certificate> {
        if !exam.has_passed() {
            return Err(AppError::InvalidState(format!(
                "Exam '{}' has not been passed",
                exam.id
            )));
        }

        if let Some(existing) = self
            .certificates
            .find_by_user_and_course(&exam.user_id, &exam.course_id)
            .await?
        {
            return Ok(existing);
        }

        let score = exam.score.unwrap_or_default();
        for attempt in 1..=ISSUE_ATTEMPTS {
            let certificate = Certificate::issue(&exam.user_id, &exam.course_id, &exam.id, score);

            match self.certificates.create(certificate).await {
                Ok(certificate) => {
                    log::info!(
                        "Issued certificate {} ({:?}) to user {} for course {}",
                        certificate.certificate_number,
                        certificate.level,
                        certificate.user_id,
                        certificate.course_id
                    );
                    return Ok(certificate);
                }
                Err(AppError::AlreadyExists(_)) => {
                    // a concurrent issue won; hand back its row
                    if let Some(existing) = self
                        .certificates
                        .find_by_user_and_course(&exam.user_id, &exam.course_id)
                        .await?
                    {
                        return Ok(existing);
                    }
                    log::warn!(
                        "Certificate number collided for exam {} (attempt {})",
                        exam.id,
                        attempt
                    );
                }
                Err(e) => {
                    log::error!("Failed to store certificate for exam {}: {}", exam.id, e);
                    return Err(e);
                }
            }
        }

        Err(AppError::InternalError(format!(
            "Could not allocate a unique certificate number for exam '{}'",
            exam.id
        )))
    }

    pub async fn generate(&self, user_id: &str, exam_id: &str) -> AppResult<Certificate> {
        let exam = self
            .schedules
            .find_by_id(exam_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", exam_id)))?;

        if exam.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only request certificates for your own exams".to_string(),
            ));
        }

        self.issue_for_exam(&exam).await
    }

    /// Public lookup. `Ok(None)` means no certificate carries this number.
    pub async fn verify(&self, certificate_number: &str) -> AppResult<Option<Certificate>> {
        let number = certificate_number.trim();
        if !certification::is_well_formed_number(number) {
            return Err(AppError::ValidationError(format!(
                "'{}' is not a valid certificate number",
                certificate_number
            )));
        }

        let certificate = self.certificates.find_by_number(number).await?;
        if let Some(found) = &certificate {
            if !found.is_untampered() {
                log::warn!(
                    "Certificate {} failed its integrity check",
                    found.certificate_number
                );
            }
        }
        Ok(certificate)
    }

    pub async fn list_mine(&self, user_id: &str) -> AppResult<Vec<Certificate>> {
        self.certificates.list_by_user(user_id).await
    }
}
